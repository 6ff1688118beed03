use super::ModelId;
use crate::stmt;

/// A field of a registered entity type. The field name doubles as the
/// column name in every table the entity type is mapped to.
#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub ty: stmt::Type,
    pub nullable: bool,

    /// Part of the primary key
    pub primary_key: bool,
}

/// Position of a field within its model's record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub model: ModelId,
    pub index: usize,
}
