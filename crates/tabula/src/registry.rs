use crate::{Context, Session};
use tabula_core::{Error, Result};

use std::{
    collections::HashMap,
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// One context per session.
///
/// Replacing or closing a session's context retires the previous one,
/// which disposes it exactly once.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    slots: Mutex<HashMap<Session, Slot>>,
}

#[derive(Debug)]
enum Slot {
    Open(Context),

    /// Closed explicitly; operations fail until the session is reopened.
    Closed,
}

/// State of a session's registry entry.
#[derive(Debug)]
pub(crate) enum Lookup {
    Open(Context),
    Closed,
    Absent,
}

impl Registry {
    pub(crate) fn lookup(&self, session: Session) -> Lookup {
        match self.lock().get(&session) {
            Some(Slot::Open(cx)) => Lookup::Open(cx.clone()),
            Some(Slot::Closed) => Lookup::Closed,
            None => Lookup::Absent,
        }
    }

    /// Installs `cx` as the session's context, retiring the one it replaces.
    pub(crate) fn publish(&self, session: Session, cx: Context) {
        let previous = self.lock().insert(session, Slot::Open(cx));

        if let Some(Slot::Open(previous)) = previous {
            previous.retire();
        }
    }

    /// Installs `cx` unless the session already has an open context, in
    /// which case `cx` is retired and the existing context returned. A
    /// closed session is only reopened if `reopen` is set.
    pub(crate) fn insert_if_absent(
        &self,
        session: Session,
        cx: Context,
        reopen: bool,
    ) -> Result<Context> {
        let mut slots = self.lock();

        match slots.get(&session) {
            Some(Slot::Open(existing)) => {
                let existing = existing.clone();
                drop(slots);
                cx.retire();
                Ok(existing)
            }
            Some(Slot::Closed) if !reopen => {
                drop(slots);
                cx.retire();
                Err(closed(session))
            }
            _ => {
                slots.insert(session, Slot::Open(cx.clone()));
                Ok(cx)
            }
        }
    }

    /// Replaces `expected` with `cx`. Fails, retiring `cx`, if the session's
    /// context changed since `expected` was read.
    pub(crate) fn replace(&self, session: Session, expected: &Context, cx: Context) -> Result<()> {
        let mut slots = self.lock();

        match slots.get(&session) {
            Some(Slot::Open(current)) if current.ptr_eq(expected) => {
                slots.insert(session, Slot::Open(cx));
                drop(slots);
                expected.retire();
                Ok(())
            }
            Some(Slot::Closed) => {
                drop(slots);
                cx.retire();
                Err(closed(session))
            }
            _ => {
                drop(slots);
                cx.retire();
                Err(replaced(session))
            }
        }
    }

    /// Retires the session's context and marks the session closed. Closing
    /// twice, or closing a session without a context, is a no-op.
    pub(crate) fn close(&self, session: Session) {
        let mut slots = self.lock();

        let Some(slot) = slots.get_mut(&session) else {
            return;
        };

        if let Slot::Open(previous) = mem::replace(slot, Slot::Closed) {
            drop(slots);
            debug!(%session, "session closed");
            previous.retire();
        }
    }

    /// Removes the session's entry, retiring its context if open.
    pub(crate) fn release(&self, session: Session) {
        let previous = self.lock().remove(&session);

        if let Some(Slot::Open(previous)) = previous {
            debug!(%session, "session released");
            previous.retire();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_closed(&self, session: Session) -> bool {
        matches!(self.lock().get(&session), Some(Slot::Closed))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Session, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn closed(session: Session) -> Error {
    Error::context_closed(format!("session {session} is closed"))
}

pub(crate) fn replaced(session: Session) -> Error {
    tabula_core::err!("context of session {session} was replaced concurrently")
}
