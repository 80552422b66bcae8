use tracing_subscriber::EnvFilter;
use tribeforge::{ServerConfig, TribeforgeError, TribeforgeServerBuilder};

#[tokio::main]
async fn main() -> Result<(), TribeforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(?config, "loaded configuration");

    let server = TribeforgeServerBuilder::from_config(&config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
