//! Error types for the nerfprep sensor-log abstraction.

use thiserror::Error;

/// Errors that can occur while resolving sensor-log records or blobs.
#[derive(Debug, Error)]
pub enum LogError {
    /// No record of the given kind exists for the token
    #[error("{kind} record not found: {token}")]
    RecordNotFound {
        /// Table name (e.g. "sample_data", "ego_pose")
        kind: &'static str,
        /// The opaque identifier that failed to resolve
        token: String,
    },
    
    /// Reading a table or blob from disk failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    
    /// A table could not be deserialized
    #[error("Parse error in {table}: {message}")]
    Parse {
        table: String,
        message: String,
    },
    
    /// A record was found but its content is unusable
    #[error("Invalid record: {0}")]
    Invalid(String),
}

impl LogError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, token: impl Into<String>) -> Self {
        Self::RecordNotFound {
            kind,
            token: token.into(),
        }
    }
    
    /// Creates an I/O error tagged with the offending path.
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
    
    /// Creates an invalid-record error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
