use super::TableId;
use crate::stmt;

/// A column of a physical table. Columns mirror the fields of the model
/// mapped to the table, in the same order.
#[derive(Debug, Clone)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub ty: stmt::Type,
    pub nullable: bool,
}

/// Position of a column within its table.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ColumnId {
    pub table: TableId,
    pub index: usize,
}

impl Column {
    /// Returns `true` if `value` may be stored in this column.
    pub fn accepts(&self, value: &stmt::Value) -> bool {
        self.ty.accepts(value.ty(), self.nullable)
    }
}
