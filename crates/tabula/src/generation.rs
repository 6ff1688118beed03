//! Versioning of the global mapping state.
//!
//! Every successful remap increments the generation. Compiled schemas are
//! cached under a [`CacheKey`] that includes the generation, so a schema
//! compiled for one generation is never handed to a context of another.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use uuid::Uuid;

/// A version of the global mapping state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly built [`Db`](crate::Db), before any remap.
    pub const INITIAL: Generation = Generation(0);

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generation counter.
///
/// The counter only moves forward. Increments happen while the remap lock
/// is held, which totally orders them with the rule-set swaps they version.
#[derive(Debug)]
pub struct GenerationCounter {
    current: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(Generation::INITIAL.0),
        }
    }

    /// The most recently published generation.
    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::Acquire))
    }

    /// Returns a generation strictly greater than any returned before and
    /// publishes it as current.
    pub fn increment(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one kind of access context, i.e. one [`Db`](crate::Db) and its
/// set of registered entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextTypeId(Uuid);

impl ContextTypeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextTypeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of a compiled schema in the schema cache.
///
/// Two contexts with equal keys share one compiled schema. Contexts of
/// different generations never do, even when their table names coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub context: ContextTypeId,
    pub generation: Generation,
}

impl CacheKey {
    pub const fn compose(context: ContextTypeId, generation: Generation) -> Self {
        Self {
            context,
            generation,
        }
    }
}
