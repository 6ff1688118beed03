use super::{Model, ModelId};
use crate::{Error, Result};

use indexmap::IndexMap;
use std::collections::HashSet;

/// The set of registered entity types.
#[derive(Debug, Default)]
pub struct Schema {
    pub models: IndexMap<ModelId, Model>,
}

impl Schema {
    /// Builds the schema from registered models, verifying each one.
    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Result<Self> {
        let mut schema = Self::default();
        let mut names = HashSet::new();

        for model in models {
            verify_model(&model)?;

            if !names.insert(model.name.clone()) {
                return Err(Error::invalid_schema(format!(
                    "entity type `{}` is registered more than once",
                    model.name
                )));
            }

            if schema.models.contains_key(&model.id) {
                return Err(Error::invalid_schema(format!(
                    "duplicate model identifier {:?}",
                    model.id
                )));
            }

            schema.models.insert(model.id, model);
        }

        Ok(schema)
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Get a model by ID
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.models.get(&id.into()).expect("invalid model ID")
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models().find(|model| model.name == name)
    }
}

fn verify_model(model: &Model) -> Result<()> {
    if model.name.is_empty() {
        return Err(Error::invalid_schema("entity type name is empty"));
    }

    if model.fields.is_empty() {
        return Err(Error::invalid_schema(format!(
            "entity type `{}` declares no fields",
            model.name
        )));
    }

    if model.primary_key.fields.is_empty() {
        return Err(Error::invalid_schema(format!(
            "entity type `{}` declares no primary key",
            model.name
        )));
    }

    for (index, field) in model.fields.iter().enumerate() {
        if field.id.model != model.id || field.id.index != index {
            return Err(Error::invalid_schema(format!(
                "field `{}` of `{}` has a mismatched identifier",
                field.name, model.name
            )));
        }

        if model.fields[..index].iter().any(|f| f.name == field.name) {
            return Err(Error::invalid_schema(format!(
                "field `{}` of `{}` is declared more than once",
                field.name, model.name
            )));
        }
    }

    for field_id in &model.primary_key.fields {
        if field_id.model != model.id || field_id.index >= model.fields.len() {
            return Err(Error::invalid_schema(format!(
                "primary key of `{}` references an unknown field",
                model.name
            )));
        }
    }

    Ok(())
}
