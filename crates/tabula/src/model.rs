use crate::schema;
use tabula_core::{stmt, Result};

use std::{any::Any, fmt};

/// An entity type that can be registered with a [`Db`](crate::Db).
pub trait Model: Sized + Send + Sync + 'static {
    /// Name of the entity type.
    const NAME: &'static str;

    /// Fields and default table of the entity type.
    fn schema() -> schema::Model;

    /// Ordered primary key accessors.
    ///
    /// Read once, when the entity type is registered.
    fn primary_key() -> PrimaryKey<Self>;

    /// Load an instance of the model, populating fields using the given
    /// record.
    fn load(record: stmt::ValueRecord) -> Result<Self>;

    /// The instance as a record, one value per field.
    fn to_record(&self) -> stmt::ValueRecord;
}

/// The primary key of an entity type: an ordered list of named accessors,
/// in declared key order.
pub struct PrimaryKey<M> {
    fields: Vec<KeyField<M>>,
}

struct KeyField<M> {
    name: &'static str,
    get: fn(&M) -> stmt::Value,
}

impl<M> PrimaryKey<M> {
    pub fn new() -> Self {
        Self { fields: vec![] }
    }

    /// Appends a key field.
    pub fn field(mut self, name: &'static str, get: fn(&M) -> stmt::Value) -> Self {
        self.fields.push(KeyField { name, get });
        self
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Extracts the key of `model`.
    pub fn key_of(&self, model: &M) -> stmt::Key {
        stmt::Key::from_vec(self.fields.iter().map(|field| (field.get)(model)).collect())
    }
}

impl<M> Default for PrimaryKey<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for PrimaryKey<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Type-erased primary key accessors of one registered entity type.
pub(crate) struct KeyDescriptor {
    extract: Box<dyn Fn(&(dyn Any + Send + Sync)) -> Option<stmt::Key> + Send + Sync>,
}

impl KeyDescriptor {
    pub(crate) fn of<M: Model>(primary_key: PrimaryKey<M>) -> Self {
        Self::from_fn(move |instance| {
            instance
                .downcast_ref::<M>()
                .map(|model| primary_key.key_of(model))
        })
    }

    pub(crate) fn from_fn(
        extract: impl Fn(&(dyn Any + Send + Sync)) -> Option<stmt::Key> + Send + Sync + 'static,
    ) -> Self {
        Self {
            extract: Box::new(extract),
        }
    }

    /// Returns `None` if `instance` is not of the descriptor's entity type.
    pub(crate) fn key_of(&self, instance: &(dyn Any + Send + Sync)) -> Option<stmt::Key> {
        (self.extract)(instance)
    }
}

impl fmt::Debug for KeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDescriptor").finish_non_exhaustive()
    }
}
