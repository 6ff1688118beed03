use super::Db;
use crate::{catalog::Catalog, model::KeyDescriptor, schema, Model};
use tabula_core::{
    driver::Driver,
    schema::app::{self, ModelId},
    Error, Result,
};

use std::any::TypeId;
use url::Url;

#[derive(Default)]
pub struct Builder {
    /// Registered entity types, in registration order
    models: Vec<Registration>,

    /// If set, prefix all table names with this string
    table_name_prefix: Option<String>,
}

struct Registration {
    type_id: TypeId,
    schema: schema::Model,
    key_fields: Vec<&'static str>,
    keys: KeyDescriptor,
}

impl Builder {
    pub fn register<M: Model>(&mut self) -> &mut Self {
        let primary_key = M::primary_key();
        let key_fields = primary_key.names().collect();

        self.models.push(Registration {
            type_id: TypeId::of::<M>(),
            schema: M::schema(),
            key_fields,
            keys: KeyDescriptor::of(primary_key),
        });
        self
    }

    /// Set the table name prefix for all tables
    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_name_prefix = Some(prefix.to_string());
        self
    }

    /// Connects to `url` with the built-in driver for its scheme.
    #[cfg(feature = "memory")]
    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        self.build(url, tabula_driver_memory::Memory::new()).await
    }

    /// Builds the [`Db`] with a caller-provided driver. `url` is the endpoint
    /// new sessions connect to.
    pub async fn build(&mut self, url: &str, driver: impl Driver) -> Result<Db> {
        let url = Url::parse(url)?;
        let catalog = self.build_catalog()?;

        Db::new(catalog, Box::new(driver), url, self.table_name_prefix.clone())
    }

    pub(crate) fn build_catalog(&mut self) -> Result<Catalog> {
        let registrations = std::mem::take(&mut self.models);

        for (index, registration) in registrations.iter().enumerate() {
            if registrations[..index]
                .iter()
                .any(|other| other.type_id == registration.type_id)
            {
                return Err(Error::invalid_schema(format!(
                    "entity type `{}` is registered more than once",
                    registration.schema.name
                )));
            }
        }

        let app_models = registrations
            .iter()
            .enumerate()
            .map(|(index, registration)| convert_schema_to_app(registration, ModelId(index)))
            .collect::<Result<Vec<_>>>()?;

        let app = app::Schema::from_models(app_models)?;

        Ok(Catalog::new(
            app.into(),
            registrations
                .into_iter()
                .enumerate()
                .map(|(index, registration)| {
                    (registration.type_id, ModelId(index), registration.keys)
                }),
        ))
    }
}

/// Convert a declared model to an app::Model with assigned ModelId
fn convert_schema_to_app(registration: &Registration, model_id: ModelId) -> Result<app::Model> {
    let declared = &registration.schema;

    let primary_key = registration
        .key_fields
        .iter()
        .map(|name| {
            declared
                .field_index(name)
                .map(|index| app::FieldId {
                    model: model_id,
                    index,
                })
                .ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "primary key field `{name}` of `{}` is not declared",
                        declared.name
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let fields = declared
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| app::Field {
            id: app::FieldId {
                model: model_id,
                index,
            },
            name: field.name.clone(),
            ty: field.ty,
            nullable: field.nullable,
            primary_key: primary_key.iter().any(|pk| pk.index == index),
        })
        .collect();

    Ok(app::Model {
        id: model_id,
        name: declared.name.clone(),
        fields,
        primary_key: app::PrimaryKey {
            fields: primary_key,
        },
        table_name: declared.table_name.clone(),
    })
}
