//! Error types for the lobby layer.

use tribeforge_store::StoreError;

/// Errors that can occur during lobby operations.
///
/// The lobby never retries. Store precondition failures (`NotFound`,
/// `AlreadyExists`, `Conflict`) pass through unchanged so the transport
/// layer can decide what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A store call failed. The enclosing transaction was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A value supplied from outside was rejected before touching the
    /// store, e.g. an empty display name.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LobbyError {
    /// Returns `true` if a referenced player, game, or membership was
    /// missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}
