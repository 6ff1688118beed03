mod cache;

mod catalog;

pub mod context;
pub use context::{AccessContext, Context, EntityState, Resolution};

pub mod db;
pub use db::Db;

pub mod generation;
pub use generation::{CacheKey, ContextTypeId, Generation};

mod model;
pub use model::{Model, PrimaryKey};

mod registry;

pub mod rule;
pub use rule::{Condition, EntityType, MappingRule, RuleSet, TableNameResolver};

pub mod schema;
pub use schema::mapping::TableMapping;

mod session;
pub use session::Session;

pub use tabula_core::{bail, err, stmt, Error, Result};

pub mod driver {
    pub use tabula_core::driver::*;
}
