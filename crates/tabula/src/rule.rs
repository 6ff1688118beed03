//! Mapping rules: which physical table each entity type resolves to.

use crate::{catalog::Catalog, Model};
use tabula_core::{
    schema::{
        app::{self, ModelId},
        verify_table_name,
    },
    Error, Result,
};

use indexmap::IndexMap;
use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

/// Computes the physical table name of an entity type from a condition.
///
/// Resolvers must be pure: the same entity type and condition always yield
/// the same name. A name that is empty or otherwise invalid fails the remap
/// that produced it.
pub trait TableNameResolver: Send + Sync + 'static {
    fn table_name(&self, model: &app::Model, condition: &Condition) -> String;
}

impl<F> TableNameResolver for F
where
    F: Fn(&app::Model, &Condition) -> String + Send + Sync + 'static,
{
    fn table_name(&self, model: &app::Model, condition: &Condition) -> String {
        self(model, condition)
    }
}

/// A caller-defined value interpreted only by a rule's resolver, e.g. the
/// date of a month-sharded table.
#[derive(Clone)]
pub struct Condition(Arc<dyn Any + Send + Sync>);

impl Condition {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// A condition carrying no value.
    pub fn none() -> Self {
        Self::new(())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// Identifies an entity type independently of where it is stored.
#[derive(Clone, Copy)]
pub struct EntityType {
    type_id: TypeId,
    name: &'static str,
}

impl EntityType {
    pub fn of<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: M::NAME,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityType {}

impl std::hash::Hash for EntityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.name)
    }
}

/// Redirects one entity type to the table its resolver computes from the
/// condition. Immutable once built.
#[derive(Clone)]
pub struct MappingRule {
    entity: EntityType,
    resolver: Arc<dyn TableNameResolver>,
    condition: Condition,
}

impl MappingRule {
    pub fn new<M: Model>(
        resolver: impl TableNameResolver,
        condition: impl Any + Send + Sync,
    ) -> Self {
        Self::for_entity(EntityType::of::<M>(), Arc::new(resolver), Condition::new(condition))
    }

    pub fn for_entity(
        entity: EntityType,
        resolver: Arc<dyn TableNameResolver>,
        condition: Condition,
    ) -> Self {
        Self {
            entity,
            resolver,
            condition,
        }
    }

    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRule")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

/// An ordered set of mapping rules, installed as a whole by a remap.
///
/// Entity types no rule names resolve to their default table.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<MappingRule>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = MappingRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MappingRule> {
        self.rules.iter()
    }

    /// Resolves every rule to a table name, in rule order.
    ///
    /// Nothing is resolved unless every entity type is registered. The
    /// physical names, with `prefix` applied, must be valid table names and
    /// no two entity types may end up in the same table. The returned names
    /// do not carry the prefix.
    pub(crate) fn resolve(
        &self,
        catalog: &Catalog,
        prefix: Option<&str>,
    ) -> Result<IndexMap<ModelId, String>> {
        let model_ids = self
            .rules
            .iter()
            .map(|rule| catalog.model_id(&rule.entity))
            .collect::<Result<Vec<_>>>()?;

        let physical = |name: &str| format!("{}{name}", prefix.unwrap_or_default());

        let mut resolved = IndexMap::<ModelId, String>::with_capacity(self.rules.len());

        for (rule, model_id) in self.rules.iter().zip(model_ids) {
            let model = catalog.model(model_id);
            let table_name = rule.resolver.table_name(model, &rule.condition);
            let physical_name = physical(&table_name);

            if let Err(reason) = verify_table_name(&physical_name) {
                return Err(Error::invalid_mapping_result(
                    &model.name,
                    physical_name,
                    reason,
                ));
            }

            if resolved.contains_key(&model_id) {
                return Err(Error::invalid_mapping_result(
                    &model.name,
                    physical_name,
                    "entity type is named by more than one rule",
                ));
            }

            if let Some((other, _)) = resolved
                .iter()
                .find(|(_, name)| physical(name) == physical_name)
            {
                return Err(Error::invalid_mapping_result(
                    &model.name,
                    physical_name,
                    format!("table is already mapped by `{}`", catalog.model(*other).name),
                ));
            }

            resolved.insert(model_id, table_name);
        }

        // Rule-mapped tables must not collide with the default tables of the
        // entity types left unmapped.
        for model in catalog.app.models() {
            if resolved.contains_key(&model.id) {
                continue;
            }

            let default_table = physical(model.default_table_name());

            if let Some((other, _)) = resolved
                .iter()
                .find(|(_, name)| physical(name) == default_table)
            {
                return Err(Error::invalid_mapping_result(
                    &catalog.model(*other).name,
                    default_table,
                    format!("table is the default table of `{}`", model.name),
                ));
            }
        }

        Ok(resolved)
    }
}

impl FromIterator<MappingRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = MappingRule>>(iter: T) -> Self {
        Self::new(iter)
    }
}
