//! Error types for the Embody domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (environment, transport, behaviors) has its own variant.

use thiserror::Error;

/// The top-level error type for all Embody operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Environment errors ---
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Behavior errors ---
    #[error("Behavior error: {0}")]
    Behavior(#[from] BehaviorError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvironmentError {
    #[error("Agent has not spawned yet")]
    NotSpawned,

    #[error("Item no longer available: {0}")]
    ItemUnavailable(String),

    #[error("Environment rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("Environment connection lost: {0}")]
    Disconnected(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind {endpoint}: {reason}")]
    Bind { endpoint: String, reason: String },

    #[error("No subscribers connected")]
    NoSubscribers,

    #[error("Transport closed: {0}")]
    Closed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("No behavior registered for action: {0}")]
    NotFound(String),

    #[error("{behavior} failed: {source}")]
    Environment {
        behavior: String,
        #[source]
        source: EnvironmentError,
    },
}
