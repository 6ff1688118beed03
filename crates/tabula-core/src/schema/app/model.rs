use super::{Field, FieldId};
use crate::stmt;

use std::fmt;

/// A registered entity type.
#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Name of the entity type, e.g. `Post`
    pub name: String,

    /// Fields contained by the model, in record order
    pub fields: Vec<Field>,

    /// The model's primary key
    pub primary_key: PrimaryKey,

    /// Default table name. When unset, the model name is used.
    pub table_name: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// Key fields of a model, in declared key order. Keys extracted from
/// instances and from stored records list their values in this order.
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    pub fields: Vec<FieldId>,
}

impl Model {
    pub fn field(&self, field: impl Into<FieldId>) -> &Field {
        let field_id = field.into();
        assert_eq!(self.id, field_id.model);
        &self.fields[field_id.index]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn primary_key_fields(&self) -> impl ExactSizeIterator<Item = &Field> + '_ {
        self.primary_key
            .fields
            .iter()
            .map(|field_id| &self.fields[field_id.index])
    }

    /// The table name used when no mapping rule applies.
    pub fn default_table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.name)
    }

    /// Extracts the primary key from a record of this model, as returned by
    /// a store.
    pub fn key_of(&self, record: &stmt::ValueRecord) -> stmt::Key {
        record.key(self.primary_key.fields.iter().map(|field| field.index))
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
