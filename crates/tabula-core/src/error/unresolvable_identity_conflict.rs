use super::Error;

/// Error when a delete collides with a tracked primary key but the tracked
/// instance holding that key cannot be located.
#[derive(Debug)]
pub(super) struct UnresolvableIdentityConflictError {
    entity: Box<str>,
    key: Box<str>,
}

impl std::error::Error for UnresolvableIdentityConflictError {}

impl core::fmt::Display for UnresolvableIdentityConflictError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unresolvable identity conflict: no tracked `{}` holds key {}",
            self.entity, self.key
        )
    }
}

impl Error {
    pub fn unresolvable_identity_conflict(entity: impl Into<String>, key: impl ToString) -> Error {
        Error::from(super::ErrorKind::UnresolvableIdentityConflict(
            UnresolvableIdentityConflictError {
                entity: entity.into().into(),
                key: key.to_string().into(),
            },
        ))
    }

    /// Returns `true` if this error is an unresolvable identity conflict.
    pub fn is_unresolvable_identity_conflict(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::UnresolvableIdentityConflict(_)
        )
    }
}
