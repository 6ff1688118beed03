use tabula_core::stmt;

use std::fmt;

/// Failure of an operation against the in-memory store.
#[derive(Debug)]
pub enum MemoryError {
    /// The table has not been created with `push_schema`
    NoSuchTable { database: String, table: String },

    /// An insert collided with a stored key
    DuplicateKey { table: String, key: stmt::Key },

    /// The record does not fit the table's columns
    RecordMismatch(String),

    /// Commit or rollback without a started transaction
    NoTransaction,

    /// Start while a transaction is already open on the connection
    NestedTransaction,
}

impl std::error::Error for MemoryError {}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchTable { database, table } => {
                write!(f, "table `{table}` does not exist in database `{database}`")
            }
            Self::DuplicateKey { table, key } => {
                write!(f, "table `{table}` already holds key {key}")
            }
            Self::RecordMismatch(reason) => write!(f, "record mismatch: {reason}"),
            Self::NoTransaction => f.write_str("no transaction in progress"),
            Self::NestedTransaction => f.write_str("a transaction is already in progress"),
        }
    }
}

impl From<MemoryError> for tabula_core::Error {
    fn from(err: MemoryError) -> Self {
        tabula_core::Error::driver(err)
    }
}
