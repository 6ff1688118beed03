use super::{Error, ErrorKind};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A store operation failed inside the driver.
///
/// The message is the driver's error followed by its sources.
#[derive(Debug)]
pub(super) struct DriverError {
    source: BoxError,
}

impl DriverError {
    pub(super) fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        self.source.as_ref()
    }
}

impl Error {
    /// Wraps a store I/O failure. It propagates to the caller unchanged; the
    /// context that produced it stays usable.
    pub fn driver(err: impl Into<BoxError>) -> Error {
        Error::from(ErrorKind::Driver(DriverError { source: err.into() }))
    }

    pub fn is_driver(&self) -> bool {
        matches!(self.kind(), ErrorKind::Driver(_))
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut next = Some(self.as_error());
        let mut first = true;

        while let Some(err) = next {
            if !first {
                f.write_str(": ")?;
            }
            core::fmt::Display::fmt(err, f)?;
            first = false;
            next = err.source();
        }

        Ok(())
    }
}
