use super::{
    app::ModelId,
    db::{ColumnId, TableId},
};

use indexmap::IndexMap;

/// Defines the correspondence between app-level models and database-level
/// tables.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    /// Mapping from models to tables, in registration order
    pub models: IndexMap<ModelId, Model>,
}

#[derive(Debug, Clone)]
pub struct Model {
    /// Model identifier
    pub id: ModelId,

    /// Table that the model maps to
    pub table: TableId,

    /// Column backing each model field, in field order
    pub columns: Vec<ColumnId>,
}

/// Which physical table an entity type currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    /// The entity type
    pub model: ModelId,

    /// Name of the entity type
    pub entity: String,

    /// Name of the physical table
    pub table_name: String,
}

impl Mapping {
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.models.get(&id.into()).expect("invalid model ID")
    }
}
