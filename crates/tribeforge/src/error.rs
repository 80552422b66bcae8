//! Unified error type for the Tribeforge server.

use tribeforge_lobby::LobbyError;
use tribeforge_protocol::ProtocolError;
use tribeforge_store::StoreError;

use crate::transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attributes let `?` lift a sub-crate error into this one.
#[derive(Debug, thiserror::Error)]
pub enum TribeforgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration sources could not be merged or parsed.
    #[error("configuration: {0}")]
    Config(#[from] figment::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TribeforgeError {
    /// The code sent to the client in an `Error` frame. Follows HTTP
    /// conventions.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Lobby(LobbyError::Store(e)) | Self::Store(e) => match e {
                StoreError::NotFound(..) => 404,
                StoreError::AlreadyExists(..) | StoreError::Conflict { .. } => 409,
                StoreError::Corrupt { .. } | StoreError::Sqlite(_) => 500,
            },
            Self::Lobby(LobbyError::InvalidInput(_)) => 400,
            Self::Protocol(ProtocolError::InvalidMessage(_))
            | Self::Protocol(ProtocolError::InvalidInput { .. })
            | Self::Protocol(ProtocolError::Decode(_)) => 400,
            _ => 500,
        }
    }
}
