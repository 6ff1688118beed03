use super::Value;

use std::fmt;

/// Primary key values of one record, in the entity type's declared key
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(value, f)?;
        }
        f.write_str(")")
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self(vec![value.into()])
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(vec![value.into()])
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(vec![value.into()])
    }
}
