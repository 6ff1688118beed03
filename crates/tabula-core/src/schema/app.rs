mod field;
pub use field::{Field, FieldId};

mod model;
pub use model::{Model, ModelId, PrimaryKey};

mod schema;
pub use schema::Schema;
