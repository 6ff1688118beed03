use super::{app, db, mapping, verify_table_name, Mapping, Schema};
use crate::{
    schema::db::{Column, ColumnId, Table, TableId},
    Error, Result,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Compiles the registered models and a set of table-name overrides into a
/// [`Schema`].
#[derive(Debug, Default, Clone)]
pub struct Builder {
    /// If set, prefix all table names with this string
    table_name_prefix: Option<String>,

    /// Table names chosen by mapping rules, replacing the model default
    table_names: IndexMap<app::ModelId, String>,
}

/// Used to track state during the build process
struct BuildSchema<'a> {
    /// Build options
    builder: &'a Builder,

    /// Maps table names to identifiers. The identifiers are reserved before the
    /// table objects are actually created.
    table_lookup: IndexMap<String, TableId>,

    /// Tables as they are built
    tables: Vec<Table>,

    /// App-level to db-level schema mapping
    mapping: Mapping,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_name_prefix = Some(prefix.to_string());
        self
    }

    /// Maps `model` to `table_name` instead of its default table.
    pub fn table_name(&mut self, model: app::ModelId, table_name: impl Into<String>) -> &mut Self {
        self.table_names.insert(model, table_name.into());
        self
    }

    /// The physical table name `model` compiles to.
    pub fn physical_table_name(&self, model: &app::Model) -> String {
        let name = match self.table_names.get(&model.id) {
            Some(name) => name.as_str(),
            None => model.default_table_name(),
        };

        match &self.table_name_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }

    pub fn build(&self, app: Arc<app::Schema>) -> Result<Schema> {
        let mut builder = BuildSchema {
            builder: self,
            table_lookup: IndexMap::new(),
            tables: vec![],
            mapping: Mapping {
                models: IndexMap::new(),
            },
        };

        for model_id in self.table_names.keys() {
            if !app.models.contains_key(model_id) {
                return Err(Error::invalid_schema(format!(
                    "table name override for unknown model {model_id:?}"
                )));
            }
        }

        for model in app.models() {
            builder.build_table_for_model(&app, model)?;
        }

        Ok(Schema {
            app,
            db: Arc::new(db::Schema {
                tables: builder.tables,
            }),
            mapping: builder.mapping,
        })
    }
}

impl BuildSchema<'_> {
    fn build_table_for_model(&mut self, app: &app::Schema, model: &app::Model) -> Result<()> {
        let table_name = self.builder.physical_table_name(model);

        if let Err(reason) = verify_table_name(&table_name) {
            return Err(Error::invalid_schema(format!(
                "table name {table_name:?} of `{}`: {reason}",
                model.name
            )));
        }

        if let Some(table_id) = self.table_lookup.get(&table_name) {
            let other = self
                .mapping
                .models
                .values()
                .find(|mapping| mapping.table == *table_id)
                .map(|mapping| app.model(mapping.id).name.as_str())
                .unwrap_or_default();

            return Err(Error::invalid_schema(format!(
                "table `{table_name}` is mapped by both `{other}` and `{}`",
                model.name
            )));
        }

        let id = self.register_table(&table_name);
        let mut table = Table::new(id, table_name);

        let columns = model
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let column_id = ColumnId { table: id, index };
                table.columns.push(Column {
                    id: column_id,
                    name: field.name.clone(),
                    ty: field.ty,
                    nullable: field.nullable,
                });
                column_id
            })
            .collect::<Vec<_>>();

        table.primary_key = model
            .primary_key
            .fields
            .iter()
            .map(|field| columns[field.index])
            .collect();

        self.tables.push(table);
        self.mapping.models.insert(
            model.id,
            mapping::Model {
                id: model.id,
                table: id,
                columns,
            },
        );

        Ok(())
    }

    fn register_table(&mut self, name: impl AsRef<str>) -> TableId {
        let id = TableId(self.table_lookup.len());
        self.table_lookup.insert(name.as_ref().to_string(), id);
        id
    }
}
