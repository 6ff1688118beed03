/// Storage type of a field or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    I64,
    String,
    DateTime,

    /// The type of [`Value::Null`](super::Value::Null)
    Null,
}

impl Type {
    /// Returns `true` if a value of type `other` may be stored in a column of
    /// this type. `nullable` allows `Null`.
    pub fn accepts(self, other: Type, nullable: bool) -> bool {
        self == other || (nullable && other == Type::Null)
    }
}
