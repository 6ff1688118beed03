use super::Operation;

/// Transaction lifecycle of a connection. `save` brackets its writes with
/// `Start` and either `Commit` or `Rollback`; transactions do not nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Start,
    Commit,

    /// Undo every write since `Start`
    Rollback,
}

impl From<Transaction> for Operation {
    fn from(tx: Transaction) -> Operation {
        Operation::Transaction(tx)
    }
}
