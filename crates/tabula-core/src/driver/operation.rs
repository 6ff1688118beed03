mod by_key;
pub use by_key::{DeleteByKey, GetByKey, UpdateByKey};

mod insert;
pub use insert::Insert;

mod query_table;
pub use query_table::QueryTable;

mod transaction;
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Create a new record
    Insert(Insert),

    /// Delete records identified by the given keys.
    DeleteByKey(DeleteByKey),

    /// Get one or more records by the primary key
    GetByKey(GetByKey),

    /// Read every record of a table
    QueryTable(QueryTable),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),

    /// Replace a record by the primary key
    UpdateByKey(UpdateByKey),
}

impl Operation {
    /// Short name of the operation, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::DeleteByKey(_) => "delete_by_key",
            Self::GetByKey(_) => "get_by_key",
            Self::QueryTable(_) => "query_table",
            Self::Transaction(_) => "transaction",
            Self::UpdateByKey(_) => "update_by_key",
        }
    }
}
