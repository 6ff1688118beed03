use super::Error;

/// Error when a session's store endpoint could not be replaced.
///
/// Raised before the replacement handle is published, so the session keeps
/// its prior context and store handle. The underlying failure is attached as
/// the cause.
#[derive(Debug)]
pub(super) struct ConnectionSwapError {
    url: Box<str>,
}

impl std::error::Error for ConnectionSwapError {}

impl core::fmt::Display for ConnectionSwapError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "connection swap failed for `{}`", self.url)
    }
}

impl Error {
    /// Creates a connection swap error for the endpoint that could not be
    /// opened. Attach the failure with [`Error::context`].
    pub fn connection_swap(url: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ConnectionSwap(ConnectionSwapError {
            url: url.into().into(),
        }))
    }

    /// Returns `true` if this error is a connection swap error.
    pub fn is_connection_swap(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ConnectionSwap(_))
    }
}
