use crate::MemoryError;
use tabula_core::{schema::db, stmt};

use indexmap::IndexMap;

/// A named in-memory database: rows per physical table, by primary key.
#[derive(Debug, Clone, Default)]
pub struct Database {
    name: String,
    tables: IndexMap<String, Rows>,
}

pub(crate) type Rows = IndexMap<stmt::Key, stmt::ValueRecord>;

/// Reverses one write made inside a transaction.
#[derive(Debug)]
pub(crate) enum Undo {
    /// Remove a row the transaction inserted
    Remove { table: String, key: stmt::Key },

    /// Put back the record an update overwrote
    Restore {
        table: String,
        key: stmt::Key,
        record: stmt::ValueRecord,
    },

    /// Put a deleted row back at its position
    Reinsert {
        table: String,
        index: usize,
        key: stmt::Key,
        record: stmt::ValueRecord,
    },
}

impl Database {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the existing tables, in creation order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Stored records of `table`, in insertion order.
    pub fn records(&self, table: &str) -> Option<Vec<stmt::ValueRecord>> {
        self.tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
    }

    pub(crate) fn create_table(&mut self, table: &db::Table) -> bool {
        if self.tables.contains_key(&table.name) {
            return false;
        }

        self.tables.insert(table.name.clone(), Rows::new());
        true
    }

    pub(crate) fn rows(&self, table: &db::Table) -> Result<&Rows, MemoryError> {
        self.tables
            .get(&table.name)
            .ok_or_else(|| self.no_such_table(table))
    }

    pub(crate) fn rows_mut(&mut self, table: &db::Table) -> Result<&mut Rows, MemoryError> {
        let Self { name, tables } = self;

        tables
            .get_mut(&table.name)
            .ok_or_else(|| MemoryError::NoSuchTable {
                database: name.clone(),
                table: table.name.clone(),
            })
    }

    /// Applies `log` newest first. Rows written by other connections since
    /// are left alone.
    pub(crate) fn undo(&mut self, log: Vec<Undo>) {
        for undo in log.into_iter().rev() {
            match undo {
                Undo::Remove { table, key } => {
                    if let Some(rows) = self.tables.get_mut(&table) {
                        rows.shift_remove(&key);
                    }
                }
                Undo::Restore { table, key, record } => {
                    if let Some(stored) = self
                        .tables
                        .get_mut(&table)
                        .and_then(|rows| rows.get_mut(&key))
                    {
                        *stored = record;
                    }
                }
                Undo::Reinsert {
                    table,
                    index,
                    key,
                    record,
                } => {
                    if let Some(rows) = self.tables.get_mut(&table) {
                        if !rows.contains_key(&key) {
                            rows.shift_insert(index.min(rows.len()), key, record);
                        }
                    }
                }
            }
        }
    }

    fn no_such_table(&self, table: &db::Table) -> MemoryError {
        MemoryError::NoSuchTable {
            database: self.name.clone(),
            table: table.name.clone(),
        }
    }
}
