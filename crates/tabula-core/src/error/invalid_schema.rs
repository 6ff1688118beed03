use super::{Error, ErrorKind};

/// An entity type registration was rejected while building a `Db`: a
/// duplicate name or table, a key naming an undeclared field, or an entity
/// type without fields or key.
#[derive(Debug)]
pub(super) struct InvalidSchema {
    reason: Box<str>,
}

impl Error {
    pub fn invalid_schema(reason: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidSchema(InvalidSchema {
            reason: reason.into().into_boxed_str(),
        }))
    }

    pub fn is_invalid_schema(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidSchema(_))
    }
}

impl core::fmt::Display for InvalidSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("invalid schema: ")?;
        f.write_str(&self.reason)
    }
}
