use super::Error;

/// Error when an operation is issued against a disposed or closed context.
#[derive(Debug)]
pub(super) struct ContextClosedError {
    message: Box<str>,
}

impl std::error::Error for ContextClosedError {}

impl core::fmt::Display for ContextClosedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "context closed: {}", self.message)
    }
}

impl Error {
    pub fn context_closed(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ContextClosed(ContextClosedError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a context closed error.
    pub fn is_context_closed(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ContextClosed(_))
    }
}
