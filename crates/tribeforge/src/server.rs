//! `TribeforgeServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby → store.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tribeforge_lobby::{Lobby, LobbyConfig};
use tribeforge_protocol::{Codec, JsonCodec};
use tribeforge_store::Store;

use crate::handler::handle_connection;
use crate::transport::WsListener;
use crate::{ServerConfig, TribeforgeError};

/// Shared state handed to every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) lobby: Lobby,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// ```rust,no_run
/// # async fn start() -> Result<(), tribeforge::TribeforgeError> {
/// use tribeforge::TribeforgeServer;
///
/// let server = TribeforgeServer::builder()
///     .bind("0.0.0.0:8443")
///     .database("lobby.db")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TribeforgeServerBuilder {
    bind_addr: String,
    database_path: PathBuf,
    lobby_config: LobbyConfig,
}

impl TribeforgeServerBuilder {
    /// Creates a builder with [`ServerConfig::default`] settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// Creates a builder from loaded settings.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            database_path: config.database_path.clone(),
            lobby_config: config.lobby_config(),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the SQLite file. `":memory:"` keeps the lobby in RAM.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Opens the database and binds the listener.
    pub async fn build(self) -> Result<TribeforgeServer<JsonCodec>, TribeforgeError> {
        let store = Arc::new(Store::open(&self.database_path)?);
        let listener = WsListener::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            lobby: Lobby::new(Arc::clone(&store), self.lobby_config),
            codec: JsonCodec,
        });
        Ok(TribeforgeServer {
            listener,
            store,
            state,
        })
    }
}

impl Default for TribeforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound lobby server. Call [`run`](Self::run) or
/// [`run_until`](Self::run_until) to start accepting connections.
pub struct TribeforgeServer<C: Codec> {
    listener: WsListener,
    store: Arc<Store>,
    state: Arc<ServerState<C>>,
}

impl TribeforgeServer<JsonCodec> {
    pub fn builder() -> TribeforgeServerBuilder {
        TribeforgeServerBuilder::new()
    }
}

impl<C: Codec> TribeforgeServer<C> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The coordinator behind this server.
    pub fn lobby(&self) -> &Lobby {
        &self.state.lobby
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), TribeforgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then drops every
    /// open connection and closes the database.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TribeforgeError> {
        let Self {
            listener,
            store,
            state,
        } = self;
        tracing::info!(addr = ?listener.local_addr().ok(), "Tribeforge server running");

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&state);
                        connections.spawn(async move {
                            let peer = incoming.peer();
                            let conn = match incoming.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            let conn_id = conn.id();
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
                Some(_) = connections.join_next() => {}
            }
        }

        tracing::info!(open = connections.len(), "shutting down");
        connections.shutdown().await;
        drop(state);

        match Arc::try_unwrap(store) {
            Ok(store) => store.close()?,
            Err(_) => tracing::warn!("database still in use, not closed"),
        }
        Ok(())
    }
}
