mod field;
pub use field::Field;

mod model;
pub use model::Model;

pub use tabula_core::schema::{app, db, mapping, verify_table_name, Builder, Schema};
