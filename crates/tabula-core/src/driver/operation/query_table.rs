use super::*;
use crate::schema::db::TableId;

#[derive(Debug, Clone)]
pub struct QueryTable {
    /// Which table to read
    pub table: TableId,
}

impl From<QueryTable> for Operation {
    fn from(value: QueryTable) -> Self {
        Self::QueryTable(value)
    }
}
