pub mod app;

mod builder;
pub use builder::Builder;

pub mod db;

pub mod mapping;
use mapping::Mapping;

mod name;
pub use name::verify_table_name;

use app::ModelId;
use db::{Table, TableId};
use std::sync::Arc;

/// A compiled schema: the registered entity types, the physical tables they
/// resolve to, and the mapping between the two.
///
/// A compiled schema is immutable. Changing which table an entity type maps
/// to means compiling a new one.
#[derive(Debug)]
pub struct Schema {
    /// Application-level schema
    pub app: Arc<app::Schema>,

    /// Database-level schema
    pub db: Arc<db::Schema>,

    /// Maps the app-level schema to the db-level schema
    pub mapping: Mapping,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn mapping_for(&self, id: impl Into<ModelId>) -> &mapping::Model {
        self.mapping.model(id)
    }

    pub fn table_for(&self, id: impl Into<ModelId>) -> &Table {
        self.db.table(self.table_id_for(id))
    }

    pub fn table_id_for(&self, id: impl Into<ModelId>) -> TableId {
        self.mapping.model(id).table
    }

    /// Returns the entity-type-to-table mapping for one model.
    pub fn table_mapping(&self, id: impl Into<ModelId>) -> mapping::TableMapping {
        let id = id.into();
        mapping::TableMapping {
            model: id,
            entity: self.app.model(id).name.clone(),
            table_name: self.table_for(id).name.clone(),
        }
    }

    /// Returns the table mapping of every registered model, in registration
    /// order.
    pub fn table_mappings(&self) -> Vec<mapping::TableMapping> {
        self.app
            .models()
            .map(|model| self.table_mapping(model.id))
            .collect()
    }
}
