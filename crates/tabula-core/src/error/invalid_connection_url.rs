use super::{Error, ErrorKind};

/// A store endpoint could not be parsed, or names a store the selected
/// driver does not serve.
#[derive(Debug)]
pub(super) struct InvalidConnectionUrl {
    reason: Box<str>,
}

impl Error {
    pub fn invalid_connection_url(reason: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidConnectionUrl(InvalidConnectionUrl {
            reason: reason.into().into_boxed_str(),
        }))
    }

    pub fn is_invalid_connection_url(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidConnectionUrl(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::invalid_connection_url(err.to_string())
    }
}

impl core::fmt::Display for InvalidConnectionUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("invalid connection URL: ")?;
        f.write_str(&self.reason)
    }
}
