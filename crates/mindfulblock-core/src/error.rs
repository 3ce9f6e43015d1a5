//! Core error types for mindfulblock-core.
//!
//! The variants mirror how each failure is meant to surface: user-facing
//! and recoverable (`DuplicateDomain`), fatal to enforcement until fixed
//! (`AdminPrivilegeRequired`), or degraded-but-running
//! (`RepositoryUnavailable`). Malformed URLs never reach this type, the
//! normaliser always falls back to a best-effort hostname.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mindfulblock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A rule for this normalized domain already exists.
    #[error("A rule for '{domain}' already exists")]
    DuplicateDomain { domain: String },

    /// The OS enforcement sink lacks the privilege it needs.
    #[error("ADMIN_REQUIRED: administrator privileges are needed to update {path}")]
    AdminPrivilegeRequired { path: PathBuf },

    /// The rule repository could not be reached; local state stays in effect.
    #[error("Rule repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// A write was rejected locally because a required field is missing.
    #[error("Schema validation failed for '{field}': {message}")]
    SchemaValidation { field: String, message: String },

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// A mode string that no migration maps to a canonical mode.
    #[error("Unknown block mode: '{0}'")]
    UnknownMode(String),

    /// Malformed import file.
    #[error("Invalid import at line {line}: {message}")]
    InvalidImport { line: usize, message: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network errors talking to the companion endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CoreError {
    /// Whether this error should downgrade the UI to the
    /// "insufficient privilege" screen.
    pub fn is_admin_required(&self) -> bool {
        matches!(self, CoreError::AdminPrivilegeRequired { .. })
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        CoreError::SchemaValidation {
            field: field.to_string(),
            message: "required field is missing or empty".to_string(),
        }
    }

    pub(crate) fn invalid_hostname(field: &str, value: &str) -> Self {
        CoreError::SchemaValidation {
            field: field.to_string(),
            message: format!("{value:?} is not a valid hostname"),
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

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No usable data directory
    #[error("Could not determine data directory: {0}")]
    NoDataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_error_carries_marker() {
        let err = CoreError::AdminPrivilegeRequired {
            path: PathBuf::from("/etc/hosts"),
        };
        assert!(err.is_admin_required());
        assert!(err.to_string().contains("ADMIN"));
    }

    #[test]
    fn duplicate_domain_is_not_admin() {
        let err = CoreError::DuplicateDomain {
            domain: "example.com".into(),
        };
        assert!(!err.is_admin_required());
        assert_eq!(err.to_string(), "A rule for 'example.com' already exists");
    }
}
