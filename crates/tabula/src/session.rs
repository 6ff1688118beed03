use std::fmt;
use uuid::Uuid;

/// Identifies a logical unit of work.
///
/// Each session owns at most one access context at a time. Sessions are
/// passed explicitly at every call site; a task may move between threads
/// without changing which context it uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Session(Uuid);

impl Session {
    /// Creates a new, unique session token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for Session {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}
