use crate::model::KeyDescriptor;
use tabula_core::{schema::app::ModelId, stmt, Error, Result};

use by_address::ByThinAddress;
use indexmap::IndexMap;
use std::{any::Any, collections::HashMap, sync::Arc};

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// A tracked entity's pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Inserted on the next save
    Added,

    /// Matches the store
    Unchanged,

    /// Replaced on the next save
    Modified,

    /// Removed from the store on the next save
    Deleted,
}

/// How a delete found the tracked entity it marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The given instance itself was tracked, or became tracked
    ByIdentity,

    /// A different tracked instance held the same primary key and was
    /// marked instead
    ByKey,
}

/// Outcome of one marking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Marked {
    Resolved(Resolution),

    /// Another instance holds the key
    Conflict(stmt::Key),

    /// Nothing tracked matches
    NotFound,
}

type Slot = (ModelId, stmt::Key);

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) instance: Instance,
    pub(crate) record: stmt::ValueRecord,
    pub(crate) state: EntityState,
}

/// The entities a context tracks, by primary key and by object identity.
#[derive(Debug, Default)]
pub(crate) struct IdentityMap {
    entries: IndexMap<Slot, Entry>,
    by_instance: HashMap<ByThinAddress<Instance>, Slot>,
}

impl IdentityMap {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, model: ModelId, key: &stmt::Key) -> Option<&Entry> {
        self.entries.get(&(model, key.clone()))
    }

    pub(crate) fn state_of(&self, instance: &Instance) -> Option<EntityState> {
        let slot = self.by_instance.get(&ByThinAddress(instance.clone()))?;
        Some(self.entries[slot].state)
    }

    /// Starts tracking `instance` under `key`. The slot must be free.
    pub(crate) fn track(
        &mut self,
        model: ModelId,
        key: stmt::Key,
        instance: Instance,
        record: stmt::ValueRecord,
        state: EntityState,
    ) {
        let slot = (model, key);
        debug_assert!(!self.entries.contains_key(&slot));

        self.by_instance
            .insert(ByThinAddress(instance.clone()), slot.clone());
        self.entries.insert(
            slot,
            Entry {
                instance,
                record,
                state,
            },
        );
    }

    /// Binds the slot of `key` to `instance`, replacing whichever instance
    /// held it. Returns the slot's previous state.
    pub(crate) fn rebind(
        &mut self,
        model: ModelId,
        key: stmt::Key,
        instance: Instance,
        record: stmt::ValueRecord,
        state: EntityState,
    ) -> Option<EntityState> {
        let slot = (model, key);
        let previous = self.entries.get(&slot).map(|entry| entry.state);

        if let Some(entry) = self.entries.get(&slot) {
            self.by_instance
                .remove(&ByThinAddress(entry.instance.clone()));
        }

        self.by_instance
            .insert(ByThinAddress(instance.clone()), slot.clone());
        self.entries.insert(
            slot,
            Entry {
                instance,
                record,
                state,
            },
        );

        previous
    }

    /// Marks `instance` for removal by object identity.
    ///
    /// An untracked instance whose key is free becomes tracked as deleted.
    pub(crate) fn mark_by_identity(
        &mut self,
        model: ModelId,
        instance: &Instance,
        keys: &KeyDescriptor,
    ) -> Marked {
        if let Some(slot) = self.by_instance.get(&ByThinAddress(instance.clone())) {
            let slot = slot.clone();
            self.mark(&slot);
            return Marked::Resolved(Resolution::ByIdentity);
        }

        let Some(key) = keys.key_of(instance.as_ref()) else {
            return Marked::NotFound;
        };

        if self.entries.contains_key(&(model, key.clone())) {
            return Marked::Conflict(key);
        }

        // Deleting a detached entity attaches it first.
        self.track(
            model,
            key,
            instance.clone(),
            stmt::ValueRecord::default(),
            EntityState::Deleted,
        );
        Marked::Resolved(Resolution::ByIdentity)
    }

    /// Marks the entity tracked under `key` for removal.
    pub(crate) fn mark_by_key(&mut self, model: ModelId, key: stmt::Key) -> Marked {
        let slot = (model, key);

        if !self.entries.contains_key(&slot) {
            return Marked::NotFound;
        }

        self.mark(&slot);
        Marked::Resolved(Resolution::ByKey)
    }

    /// Added entities were never stored, so marking one cancels its insert.
    fn mark(&mut self, slot: &Slot) {
        let Some(entry) = self.entries.get_mut(slot) else {
            return;
        };

        if entry.state == EntityState::Added {
            self.detach(slot);
        } else {
            entry.state = EntityState::Deleted;
        }
    }

    pub(crate) fn detach(&mut self, slot: &Slot) -> Option<Entry> {
        let entry = self.entries.shift_remove(slot)?;
        self.by_instance
            .remove(&ByThinAddress(entry.instance.clone()));
        Some(entry)
    }

    /// Entries with a pending change, in tracking order.
    pub(crate) fn pending(&self) -> impl Iterator<Item = (&Slot, &Entry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state != EntityState::Unchanged)
    }

    /// Settles pending changes after they were written to the store.
    pub(crate) fn accept_changes(&mut self) {
        let deleted = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state == EntityState::Deleted)
            .map(|(slot, _)| slot.clone())
            .collect::<Vec<_>>();

        for slot in &deleted {
            self.detach(slot);
        }

        for entry in self.entries.values_mut() {
            entry.state = EntityState::Unchanged;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.by_instance.clear();
    }
}

/// Marks exactly one tracked entity of `model` for removal on behalf of
/// `instance`.
///
/// The instance itself is marked if it is tracked, or if no other instance
/// holds its key. Otherwise the instance holding the key is marked.
pub(crate) fn resolve_delete(
    tracked: &mut IdentityMap,
    model: ModelId,
    entity: &str,
    instance: &Instance,
    keys: &KeyDescriptor,
) -> Result<Resolution> {
    match tracked.mark_by_identity(model, instance, keys) {
        Marked::Resolved(resolution) => Ok(resolution),
        Marked::Conflict(key) => match tracked.mark_by_key(model, key.clone()) {
            Marked::Resolved(resolution) => Ok(resolution),
            Marked::Conflict(_) | Marked::NotFound => {
                Err(Error::unresolvable_identity_conflict(entity, key))
            }
        },
        Marked::NotFound => Err(Error::unresolvable_identity_conflict(
            entity,
            "<unavailable>",
        )),
    }
}
