//! Error types for query processing.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, KypherError>;

/// Errors that can occur while importing, translating, or executing queries.
#[derive(Debug, Error)]
pub enum KypherError {
    /// Malformed or unreadable input data.
    #[error("Input error: {message}")]
    Input { message: String },

    /// Invalid Kypher query text; the message carries the rendered
    /// position pointer.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A query that parsed but does not make sense against its inputs.
    #[error("Semantic error: {message}")]
    Semantic { message: String },

    /// Graph data could not be imported into the cache.
    #[error("Import error: {message}")]
    Import { message: String },

    /// The embedded engine rejected a translated query.
    #[error("Execution error: {message} in SQL: {sql}")]
    Execution { message: String, sql: String },

    /// Engine-level error outside of query execution.
    #[error("SQL error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KypherError {
    /// Create an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create an input error with file and line context.
    pub fn input_at(file: impl std::fmt::Display, line: u64, message: impl std::fmt::Display) -> Self {
        Self::Input {
            message: format!("{message} ({file}:{line})"),
        }
    }

    /// Create a semantic error.
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
        }
    }

    /// Create an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }

    /// Create an execution error carrying the offending SQL.
    pub fn execution(message: impl std::fmt::Display, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: message.to_string(),
            sql: sql.into(),
        }
    }

    /// True if this error is a broken pipe on the output side.
    ///
    /// Broken pipe is treated as success after cleanup, so a query piped
    /// into `head` terminates cleanly.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
