//! Operations addressing stored records by primary key.

use super::Operation;
use crate::{schema::db::TableId, stmt};

/// Reads the records stored under `keys`. Missing keys are skipped.
#[derive(Debug, Clone)]
pub struct GetByKey {
    pub table: TableId,
    pub keys: Vec<stmt::Key>,
}

/// Replaces the record stored under `key`. Affects no rows if the key is
/// not stored.
#[derive(Debug, Clone)]
pub struct UpdateByKey {
    pub table: TableId,
    pub key: stmt::Key,

    /// One value per column
    pub record: stmt::ValueRecord,
}

/// Removes the records stored under `keys` and counts the rows removed.
#[derive(Debug, Clone)]
pub struct DeleteByKey {
    pub table: TableId,
    pub keys: Vec<stmt::Key>,
}

impl From<GetByKey> for Operation {
    fn from(op: GetByKey) -> Operation {
        Operation::GetByKey(op)
    }
}

impl From<UpdateByKey> for Operation {
    fn from(op: UpdateByKey) -> Operation {
        Operation::UpdateByKey(op)
    }
}

impl From<DeleteByKey> for Operation {
    fn from(op: DeleteByKey) -> Operation {
        Operation::DeleteByKey(op)
    }
}
