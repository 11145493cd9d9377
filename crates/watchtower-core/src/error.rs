//! Core error types for watchtower-core.
//!
//! Two failure classes matter at runtime: a key-value store that was never
//! configured (fatal to whatever triggered it) and errors raised inside a
//! scheduled tick (logged to the store and swallowed by the scheduler).
//! Everything else funnels into [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for watchtower-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opportunity source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A stored value did not match the schema expected for its key
    #[error("Schema mismatch for key '{key}': {reason}")]
    Schema { key: String, reason: String },

    /// A record the operation needs does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record is in a state that does not allow the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Endpoint URL or access token missing
    #[error("Key-value store not configured: set store.url and store.token (or KV_REST_API_URL / KV_REST_API_TOKEN)")]
    NotConfigured,

    /// Transport failure talking to the store
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error reply
    #[error("Store rejected {command}: {message}")]
    Api { command: String, message: String },

    /// The store answered with something we cannot interpret
    #[error("Unexpected reply to {command}: {message}")]
    UnexpectedResponse { command: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Could not locate or create the config directory
    #[error("Failed to access config directory: {0}")]
    DataDir(String),
}

/// Errors raised by an opportunity source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure
    #[error("{source_name}: request failed: {message}")]
    Http { source_name: String, message: String },

    /// Non-success HTTP status
    #[error("{source_name}: HTTP {status}")]
    Status { source_name: String, status: u16 },

    /// Response body was not a list of opportunities
    #[error("{source_name}: could not decode opportunities: {message}")]
    Decode { source_name: String, message: String },
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl CoreError {
    /// Whether this error means the store was never configured.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, CoreError::Store(StoreError::NotConfigured))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
