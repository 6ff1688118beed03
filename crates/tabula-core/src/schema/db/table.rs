use super::{Column, ColumnId};
use crate::stmt;

use std::fmt;

/// A physical table
#[derive(Debug, Clone)]
pub struct Table {
    /// Uniquely identifies a table within its schema
    pub id: TableId,

    /// Name of the table
    pub name: String,

    /// The table's columns
    pub columns: Vec<Column>,

    /// Primary key columns, in key order
    pub primary_key: Vec<ColumnId>,
}

/// Uniquely identifies a table
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct TableId(pub usize);

impl Table {
    pub fn primary_key_columns(&self) -> impl ExactSizeIterator<Item = &Column> + '_ {
        self.primary_key
            .iter()
            .map(|column_id| &self.columns[column_id.index])
    }

    pub fn column(&self, id: impl Into<ColumnId>) -> &Column {
        &self.columns[id.into().index]
    }

    /// Returns the key of a record stored in this table.
    pub fn key_of(&self, record: &stmt::ValueRecord) -> stmt::Key {
        record.key(self.primary_key.iter().map(|column| column.index))
    }

    /// Checks a record against the table's columns, returning a description
    /// of the first mismatch.
    pub fn check_record(&self, record: &stmt::ValueRecord) -> Result<(), String> {
        if record.len() != self.columns.len() {
            return Err(format!(
                "table `{}` has {} columns, record has {} values",
                self.name,
                self.columns.len(),
                record.len()
            ));
        }

        for (column, value) in self.columns.iter().zip(record.iter()) {
            if !column.accepts(value) {
                return Err(format!(
                    "column `{}.{}` expects {:?}, got {:?}",
                    self.name,
                    column.name,
                    column.ty,
                    value.ty()
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn new(id: TableId, name: String) -> Self {
        Self {
            id,
            name,
            columns: vec![],
            primary_key: vec![],
        }
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "TableId({})", self.0)
    }
}
