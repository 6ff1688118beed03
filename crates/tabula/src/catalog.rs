use crate::{model::KeyDescriptor, rule::EntityType, Model};
use tabula_core::{
    schema::app::{self, ModelId},
    Error, Result,
};

use indexmap::IndexMap;
use std::{any::TypeId, collections::HashMap, sync::Arc};

/// The registered entity types of a [`Db`](crate::Db) with their key
/// descriptors.
#[derive(Debug)]
pub(crate) struct Catalog {
    pub(crate) app: Arc<app::Schema>,
    by_type: HashMap<TypeId, ModelId>,
    keys: IndexMap<ModelId, KeyDescriptor>,
}

impl Catalog {
    pub(crate) fn new(
        app: Arc<app::Schema>,
        entries: impl IntoIterator<Item = (TypeId, ModelId, KeyDescriptor)>,
    ) -> Self {
        let mut by_type = HashMap::new();
        let mut keys = IndexMap::new();

        for (type_id, model_id, descriptor) in entries {
            by_type.insert(type_id, model_id);
            keys.insert(model_id, descriptor);
        }

        Self { app, by_type, keys }
    }

    /// Returns the model an entity type was registered as.
    pub(crate) fn model_id(&self, entity: &EntityType) -> Result<ModelId> {
        self.by_type
            .get(&entity.type_id())
            .copied()
            .ok_or_else(|| Error::mapping_not_found(entity.name()))
    }

    pub(crate) fn model_id_of<M: Model>(&self) -> Result<ModelId> {
        self.model_id(&EntityType::of::<M>())
    }

    pub(crate) fn model(&self, id: ModelId) -> &app::Model {
        self.app.model(id)
    }

    pub(crate) fn key_descriptor(&self, id: ModelId) -> &KeyDescriptor {
        &self.keys[&id]
    }
}
