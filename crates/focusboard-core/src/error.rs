//! Core error types for focusboard-core.
//!
//! This module defines the error hierarchy using thiserror. Storage,
//! configuration and validation failures each get their own enum; the
//! calendar sync taxonomy lives in [`SyncError`], which also knows how to
//! map itself onto the status codes the trigger surface reports.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Calendar sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// OS credential store errors
    #[error("Credential store error: {0}")]
    Credential(#[from] keyring::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Status code reported to the UI layer for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Sync(e) => e.status_code(),
            CoreError::Validation(_) => 400,
            _ => 500,
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt value in column '{column}': {message}")]
    Corrupt { column: String, message: String },
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

    /// Unknown dotted configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No usable data directory
    #[error("Cannot determine data directory: {0}")]
    NoDataDir(String),
}

/// Validation errors for user-supplied input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or absent
    #[error("'{0}' is required")]
    MissingField(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Referenced entity does not exist locally
    #[error("{kind} '{id}' not found")]
    UnknownEntity { kind: String, id: String },
}

/// Calendar sync error taxonomy.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No remote calendar is bound
    #[error("No Google Calendar configured; run setup first")]
    NotConfigured,

    /// Missing or expired credential
    #[error("Not authenticated with Google Calendar")]
    Unauthenticated,

    /// Network failure or provider outage
    #[error("Google Calendar unavailable: {0}")]
    RemoteUnavailable(String),

    /// The provider refused the operation
    #[error("Permission denied by Google Calendar: {0}")]
    Forbidden(String),

    /// Stale identifier on update/delete
    #[error("Remote event not found: {0}")]
    NotFound(String),

    /// Malformed input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another cycle holds the single-flight guard
    #[error("A sync is already in progress")]
    SyncInProgress,

    /// Local store failure
    #[error("Local storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// A remote payload could not be mapped
    #[error("Cannot map remote payload: {0}")]
    Mapping(String),
}

impl SyncError {
    /// Status code for the trigger surface: 401 not configured or
    /// unauthenticated, 400 bad input, 409 busy, 500 everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::NotConfigured | SyncError::Unauthenticated => 401,
            SyncError::Validation(_) => 400,
            SyncError::SyncInProgress => 409,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::RemoteUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Mapping(err.to_string())
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Storage(err.into())
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Sync(e) => e,
            CoreError::Validation(e) => SyncError::Validation(e),
            CoreError::Database(e) => SyncError::Storage(e),
            CoreError::Json(e) => SyncError::Mapping(e.to_string()),
            other => SyncError::Storage(DatabaseError::QueryFailed(other.to_string())),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
