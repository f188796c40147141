//! Error types for reaper_core.

use thiserror::Error;

/// Result type alias using reaper_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during reaper operations.
///
/// App-facing write operations never surface these to their caller; they
/// are logged and the operation becomes a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Referenced node does not exist.
    #[error("Node not found: ({app}, {node_id})")]
    NodeNotFound { app: String, node_id: u32 },

    /// Operation would create a duplicate `(app, node_id)` key.
    #[error("Node already exists: ({app}, {node_id})")]
    NodeCollision { app: String, node_id: u32 },

    /// No application was issued the given secret.
    #[error("Application secret not found: {secret}")]
    SecretNotFound { secret: u64 },

    /// Transfer handle was never issued or its parked node is gone.
    #[error("Transfer not found: {transfer_id}")]
    TransferNotFound { transfer_id: u32 },

    /// A node exists without a valid reciprocal peer.
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Configuration file is malformed.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a NodeNotFound error.
    pub fn node_not_found(app: impl Into<String>, node_id: u32) -> Self {
        Error::NodeNotFound {
            app: app.into(),
            node_id,
        }
    }

    /// Create a NodeCollision error.
    pub fn node_collision(app: impl Into<String>, node_id: u32) -> Self {
        Error::NodeCollision {
            app: app.into(),
            node_id,
        }
    }

    /// Create a SecretNotFound error.
    pub fn secret_not_found(secret: u64) -> Self {
        Error::SecretNotFound { secret }
    }

    /// Create a TransferNotFound error.
    pub fn transfer_not_found(transfer_id: u32) -> Self {
        Error::TransferNotFound { transfer_id }
    }

    /// Create an InvariantViolation error.
    pub fn invariant_violation(reason: impl Into<String>) -> Self {
        Error::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::node_not_found("mojo:a", 7).to_string(),
            "Node not found: (mojo:a, 7)"
        );
        assert_eq!(
            Error::node_collision("mojo:a", 1).to_string(),
            "Node already exists: (mojo:a, 1)"
        );
        assert_eq!(
            Error::secret_not_found(42).to_string(),
            "Application secret not found: 42"
        );
    }
}
