use super::Error;

/// Error when a table name resolver produced a name that cannot be applied.
///
/// This occurs when:
/// - The resolver returned an empty or whitespace-only name
/// - The name contains quotes, control characters or is too long
/// - Two entity types in one rule set resolve to the same physical table
/// - The same entity type appears more than once in one rule set
///
/// The remap that produced it applies nothing.
#[derive(Debug)]
pub(super) struct InvalidMappingResultError {
    entity: Box<str>,
    table_name: Box<str>,
    reason: Box<str>,
}

impl std::error::Error for InvalidMappingResultError {}

impl core::fmt::Display for InvalidMappingResultError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid mapping result: entity type `{}` resolved to table {:?}: {}",
            self.entity, self.table_name, self.reason
        )
    }
}

impl Error {
    pub fn invalid_mapping_result(
        entity: impl Into<String>,
        table_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::InvalidMappingResult(
            InvalidMappingResultError {
                entity: entity.into().into(),
                table_name: table_name.into().into(),
                reason: reason.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an invalid mapping result error.
    pub fn is_invalid_mapping_result(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidMappingResult(_))
    }
}
