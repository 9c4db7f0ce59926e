//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A mini-game was started while another one still holds the input.
    #[error("mini-game conflict: {active} is active, cannot start {requested}")]
    MiniGameConflict {
        /// The game currently holding focus.
        active: String,
        /// The game that was requested.
        requested: String,
    },

    /// A button label that the calculator does not have.
    #[error("unknown button: {0}")]
    UnknownButton(String),
}
