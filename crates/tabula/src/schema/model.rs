use super::Field;
use tabula_core::stmt;

/// An entity type's schema as declared by its [`Model`](crate::Model)
/// implementation.
///
/// This is the unregistered form of [`app::Model`](super::app::Model): it
/// carries no identifiers, and the primary key comes from the entity type's
/// key descriptor.
#[derive(Debug, Clone)]
pub struct Model {
    /// Name of the entity type
    pub name: String,

    /// Fields, in record order
    pub fields: Vec<Field>,

    /// If the entity type is stored in a table other than its name by
    /// default, this is set.
    pub table_name: Option<String>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
            table_name: None,
        }
    }

    /// Appends a non-nullable field.
    pub fn field(mut self, name: impl Into<String>, ty: stmt::Type) -> Self {
        self.fields.push(Field::new(name, ty, false));
        self
    }

    /// Appends a nullable field.
    pub fn nullable_field(mut self, name: impl Into<String>, ty: stmt::Type) -> Self {
        self.fields.push(Field::new(name, ty, true));
        self
    }

    /// Sets the default table name.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}
