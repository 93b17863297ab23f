//! Typed errors for the SQL crate.

use std::fmt;

/// Errors that can occur while talking to the local database.
#[derive(Debug)]
pub enum DatabaseError {
    /// The database URI could not be understood.
    InvalidUri(String),
    /// Failed to open the database file.
    ConnectionFailed(String),
    /// The requested table does not exist.
    TableNotFound(String),
    /// A query against the database failed.
    QueryFailed(String),
    /// A statement other than a read was rejected.
    ReadOnlyViolation(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::InvalidUri(msg) => write!(f, "invalid database URI: {}", msg),
            DatabaseError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            DatabaseError::TableNotFound(msg) => write!(f, "table not found: {}", msg),
            DatabaseError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            DatabaseError::ReadOnlyViolation(msg) => {
                write!(f, "only read statements are allowed: {}", msg)
            }
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::QueryFailed(e.to_string())
    }
}
