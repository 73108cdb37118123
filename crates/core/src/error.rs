//! Error types for the autoclaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator of the agent loop has its own error enum; the loop
//! folds them into [`Error`] when a cycle is aborted.

use thiserror::Error;

/// The top-level error type for all autoclaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Command errors ---
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    // --- Plugin errors ---
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    // --- Operator console errors ---
    #[error("Console error: {0}")]
    Console(#[from] ConsoleError),

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

/// Failure of the text-generation backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failure while looking up or running a registered command.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    NotFound(String),

    #[error("Command execution failed: {command}: {reason}")]
    ExecutionFailed { command: String, reason: String },

    #[error("Permission denied: {command}: {reason}")]
    PermissionDenied { command: String, reason: String },

    #[error("Invalid command arguments: {0}")]
    InvalidArguments(String),
}

/// A plugin handler faulted while transforming a hook value.
#[derive(Debug, Clone, Error)]
#[error("plugin '{plugin}' failed at {point}: {reason}")]
pub struct PluginError {
    pub plugin: String,
    pub point: String,
    pub reason: String,
}

/// The operator console could not be read or written.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Console input closed")]
    Closed,

    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
