//! Bounded, context-keyed scratch store.
//!
//! Two parallel tables hold the per-context draft and situation, like
//! the pair of fixed-size hash maps they model.  Entries live only
//! between explicit create and delete calls — there is no expiry.
//! Each table is bounded independently, so an insert can succeed in
//! one and fail in the other; handlers detect the resulting asymmetry
//! via [`Lookup::Asymmetric`] and treat it as corruption.

use crate::draft::EventDraft;
use crate::probe::ContextId;
use crate::situation::Situation;
use meshtrace_protocol::SCRATCH_CAPACITY;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Failure of a scratch-store write.
///
/// Callers absorb this silently: a missed write shows up as a
/// lookup-after-put miss, which every handler already tolerates.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("scratch store at capacity ({0} live contexts)")]
    AtCapacity(usize),
}

/// Result of reading a context's scratch state.
#[derive(Debug)]
pub enum Lookup {
    /// Both tables hold an entry.
    Present(EventDraft, Situation),
    /// Neither table holds an entry.
    Absent,
    /// Exactly one table holds an entry — corruption; the finder must
    /// delete both and stop processing this context.
    Asymmetric,
}

#[derive(Default)]
struct Tables {
    drafts: HashMap<ContextId, EventDraft>,
    situations: HashMap<ContextId, Situation>,
}

impl Tables {
    // Bounded insert with overwrite-if-present semantics.
    fn bounded_insert<V>(
        map: &mut HashMap<ContextId, V>,
        cap: usize,
        ctx: ContextId,
        value: V,
    ) -> Result<(), StoreError> {
        if map.len() >= cap && !map.contains_key(&ctx) {
            return Err(StoreError::AtCapacity(cap));
        }
        map.insert(ctx, value);
        Ok(())
    }
}

/// The per-context scratch store.
///
/// Single-key operations are atomic with respect to concurrent
/// contexts; all operations are non-blocking and bounded-time.
pub struct ScratchStore {
    inner: Mutex<Tables>,
    capacity: usize,
}

impl ScratchStore {
    /// A store bounded at the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(SCRATCH_CAPACITY)
    }

    /// A store bounded at `capacity` live contexts per table.
    pub fn with_capacity(capacity: usize) -> Self {
        ScratchStore {
            inner: Mutex::new(Tables::default()),
            capacity,
        }
    }

    /// Write both entries for `ctx`, overwriting unconditionally.
    ///
    /// At capacity the write fails for whichever table is full; the
    /// caller proceeds regardless.
    pub fn put(
        &self,
        ctx: ContextId,
        draft: EventDraft,
        situation: Situation,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().expect("scratch store poisoned");
        let a = Tables::bounded_insert(&mut tables.drafts, self.capacity, ctx, draft);
        let b = Tables::bounded_insert(&mut tables.situations, self.capacity, ctx, situation);
        a.and(b)
    }

    /// Write only the situation entry, clearing any draft.
    ///
    /// Used by the expire bracket, whose deletions read directly from
    /// probe arguments instead of a draft.
    pub fn put_situation_only(
        &self,
        ctx: ContextId,
        situation: Situation,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().expect("scratch store poisoned");
        tables.drafts.remove(&ctx);
        Tables::bounded_insert(&mut tables.situations, self.capacity, ctx, situation)
    }

    /// Read both entries for `ctx`.
    pub fn get(&self, ctx: ContextId) -> Lookup {
        let tables = self.inner.lock().expect("scratch store poisoned");
        match (
            tables.drafts.get(&ctx).copied(),
            tables.situations.get(&ctx).copied(),
        ) {
            (Some(draft), Some(situation)) => Lookup::Present(draft, situation),
            (None, None) => Lookup::Absent,
            _ => Lookup::Asymmetric,
        }
    }

    /// Read only the situation entry.
    ///
    /// The delete handler uses this: during an expire bracket the
    /// situation is legitimately present without a draft.
    pub fn situation_of(&self, ctx: ContextId) -> Option<Situation> {
        let tables = self.inner.lock().expect("scratch store poisoned");
        tables.situations.get(&ctx).copied()
    }

    /// Remove both entries for `ctx`. Idempotent.
    pub fn delete(&self, ctx: ContextId) {
        let mut tables = self.inner.lock().expect("scratch store poisoned");
        tables.drafts.remove(&ctx);
        tables.situations.remove(&ctx);
    }

    /// Number of contexts with a situation entry.
    pub fn len(&self) -> usize {
        let tables = self.inner.lock().expect("scratch store poisoned");
        tables.situations.len()
    }

    /// Whether no context holds any entry in either table.
    pub fn is_empty(&self) -> bool {
        let tables = self.inner.lock().expect("scratch store poisoned");
        tables.drafts.is_empty() && tables.situations.is_empty()
    }
}

impl Default for ScratchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtrace_protocol::MacAddr;

    fn draft(byte: u8) -> EventDraft {
        EventDraft {
            dst: MacAddr([byte; 6]),
            ..EventDraft::default()
        }
    }

    #[test]
    fn put_then_get_returns_exact_value() {
        let store = ScratchStore::new();
        store.put(7, draft(0xaa), Situation::Add).unwrap();
        match store.get(7) {
            Lookup::Present(d, s) => {
                assert_eq!(d.dst, MacAddr([0xaa; 6]));
                assert_eq!(s, Situation::Add);
            }
            other => panic!("expected present, got {other:?}"),
        }
    }

    #[test]
    fn put_overwrites_unconditionally() {
        let store = ScratchStore::new();
        store.put(1, draft(1), Situation::Add).unwrap();
        store.put(1, draft(2), Situation::Delete).unwrap();
        match store.get(1) {
            Lookup::Present(d, s) => {
                assert_eq!(d.dst, MacAddr([2; 6]));
                assert_eq!(s, Situation::Delete);
            }
            other => panic!("expected present, got {other:?}"),
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let store = ScratchStore::new();
        store.put(3, draft(0), Situation::Assign).unwrap();
        store.delete(3);
        store.delete(3);
        assert!(matches!(store.get(3), Lookup::Absent));
        assert!(store.is_empty());
    }

    #[test]
    fn situation_only_entry_is_asymmetric_to_get() {
        let store = ScratchStore::new();
        store.put_situation_only(9, Situation::Expire).unwrap();
        assert!(matches!(store.get(9), Lookup::Asymmetric));
        assert_eq!(store.situation_of(9), Some(Situation::Expire));
    }

    #[test]
    fn put_situation_only_clears_existing_draft() {
        let store = ScratchStore::new();
        store.put(4, draft(5), Situation::Add).unwrap();
        store.put_situation_only(4, Situation::Expire).unwrap();
        assert!(matches!(store.get(4), Lookup::Asymmetric));
    }

    #[test]
    fn capacity_bound_fails_new_keys_only() {
        let store = ScratchStore::with_capacity(2);
        store.put(1, draft(1), Situation::Add).unwrap();
        store.put(2, draft(2), Situation::Add).unwrap();
        assert_eq!(
            store.put(3, draft(3), Situation::Add),
            Err(StoreError::AtCapacity(2))
        );
        assert!(matches!(store.get(3), Lookup::Absent));
        // Overwrites of live keys still succeed at capacity.
        store.put(1, draft(9), Situation::Change).unwrap();
        assert_eq!(store.len(), 2);
    }
}
