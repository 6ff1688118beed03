use super::Error;

/// Error when an entity is added while another instance with the same
/// primary key is already tracked by the context.
#[derive(Debug)]
pub(super) struct IdentityConflictError {
    entity: Box<str>,
    key: Box<str>,
}

impl std::error::Error for IdentityConflictError {}

impl core::fmt::Display for IdentityConflictError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "identity conflict: a `{}` with key {} is already tracked",
            self.entity, self.key
        )
    }
}

impl Error {
    pub fn identity_conflict(entity: impl Into<String>, key: impl ToString) -> Error {
        Error::from(super::ErrorKind::IdentityConflict(IdentityConflictError {
            entity: entity.into().into(),
            key: key.to_string().into(),
        }))
    }

    pub fn is_identity_conflict(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::IdentityConflict(_))
    }
}
