use super::*;
use crate::{schema::db::TableId, stmt};

#[derive(Debug, Clone)]
pub struct Insert {
    /// Which table to insert into
    pub table: TableId,

    /// Primary key of the new record
    pub key: stmt::Key,

    /// The record, one value per column
    pub record: stmt::ValueRecord,
}

impl From<Insert> for Operation {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}
