use super::Error;

/// Error when a rule or lookup references an entity type that was never
/// registered.
#[derive(Debug)]
pub(super) struct MappingNotFoundError {
    entity: Box<str>,
}

impl std::error::Error for MappingNotFoundError {}

impl core::fmt::Display for MappingNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "mapping not found: entity type `{}` is not registered",
            self.entity
        )
    }
}

impl Error {
    pub fn mapping_not_found(entity: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::MappingNotFound(MappingNotFoundError {
            entity: entity.into().into(),
        }))
    }

    /// Returns `true` if this error is a mapping not found error.
    pub fn is_mapping_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::MappingNotFound(_))
    }
}
