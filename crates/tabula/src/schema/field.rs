use tabula_core::stmt;

#[derive(Debug, Clone)]
pub struct Field {
    /// The field name
    pub name: String,

    /// Storage type
    pub ty: stmt::Type,

    /// True if the field can be null (`None` in Rust).
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: stmt::Type, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }
}
