//! Keyed result cache with explicit presence semantics
//!
//! Every slot is in one of three states:
//!
//! - absent: never computed, or invalidated ([`Lookup::Miss`])
//! - in progress: a computation for this key is running further up the call
//!   stack ([`Lookup::InProgress`])
//! - present: a computed entry, which may legitimately be empty ([`Lookup::Hit`])
//!
//! Callers that may be re-entered while computing an entry call
//! [`ResultCache::begin`] first, then [`ResultCache::set`] with the result
//! (or [`ResultCache::abandon`] on failure). In-progress slots record the
//! computing threads. A re-entrant reader on one of those threads observes
//! `InProgress`; any other thread observes `Miss` and computes the entry
//! itself, so it never sees a half-built result.
//!
//! The cache also tracks which value entries still need their defaults
//! merged in, one flag per composite key.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::ValueMap;
use crate::schema::Schema;

/// Which kind of data a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    /// Raw persisted values, merged with defaults once
    Values,
    /// Normalized option schema
    Schema,
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheDomain::Values => write!(f, "values"),
            CacheDomain::Schema => write!(f, "options"),
        }
    }
}

/// Composite cache key: model identity, domain and scope fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Model identity
    pub model: String,
    /// Kind of entry
    pub domain: CacheDomain,
    /// Scope fingerprint, `None` for the unscoped option set
    pub scope: Option<String>,
}

impl CacheKey {
    /// Create a cache key.
    pub fn new(model: impl Into<String>, domain: CacheDomain, scope: Option<String>) -> Self {
        Self {
            model: model.into(),
            domain,
            scope,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "optmodel:{}/{}", self.model, self.domain)?;
        if let Some(scope) = &self.scope {
            write!(f, "/{scope}")?;
        }
        Ok(())
    }
}

/// A computed cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntry {
    /// Raw or merged option values
    Values(ValueMap),
    /// Normalized schema, shared with readers
    Schema(Arc<Schema>),
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Nothing cached for this key
    Miss,
    /// The entry is being computed further up the current thread's stack
    InProgress,
    /// A computed entry
    Hit(T),
}

impl<T> Lookup<T> {
    /// Convert into an `Option`, treating in-progress as absent.
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::InProgress => None,
        }
    }
}

#[derive(Debug)]
enum Slot {
    InProgress(HashSet<ThreadId>),
    Ready(CachedEntry),
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<CacheKey, Slot>,
    pending_merge: HashSet<CacheKey>,
}

/// Shared cache of computed values and schemas.
///
/// The internal lock is only held for single map operations, never across
/// calls into collaborators, so resolution may re-enter the cache freely.
///
/// # Example
///
/// ```
/// use optmodel_core::cache::{CacheDomain, CacheKey, CachedEntry, Lookup, ResultCache};
/// use optmodel_core::ValueMap;
///
/// let cache = ResultCache::new();
/// let key = CacheKey::new("theme", CacheDomain::Values, None);
///
/// assert_eq!(cache.lookup(&key), Lookup::Miss);
///
/// cache.set(key.clone(), CachedEntry::Values(ValueMap::new()));
/// assert_eq!(cache.lookup(&key), Lookup::Hit(CachedEntry::Values(ValueMap::new())));
///
/// cache.delete(&key);
/// assert_eq!(cache.lookup(&key), Lookup::Miss);
/// ```
#[derive(Debug, Default)]
pub struct ResultCache {
    state: Mutex<CacheState>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the maps consistent, so a poisoned
        // lock still guards valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an entry.
    ///
    /// An entry being computed on another thread is reported as a miss.
    pub fn lookup(&self, key: &CacheKey) -> Lookup<CachedEntry> {
        match self.state().slots.get(key) {
            None => Lookup::Miss,
            Some(Slot::InProgress(owners)) if owners.contains(&thread::current().id()) => {
                Lookup::InProgress
            }
            Some(Slot::InProgress(_)) => Lookup::Miss,
            Some(Slot::Ready(entry)) => Lookup::Hit(entry.clone()),
        }
    }

    /// Look up a values entry. Entries of another kind count as a miss.
    pub fn values(&self, key: &CacheKey) -> Lookup<ValueMap> {
        match self.lookup(key) {
            Lookup::Hit(CachedEntry::Values(values)) => Lookup::Hit(values),
            Lookup::InProgress => Lookup::InProgress,
            Lookup::Hit(CachedEntry::Schema(_)) | Lookup::Miss => Lookup::Miss,
        }
    }

    /// Look up a schema entry. Entries of another kind count as a miss.
    pub fn schema(&self, key: &CacheKey) -> Lookup<Arc<Schema>> {
        match self.lookup(key) {
            Lookup::Hit(CachedEntry::Schema(schema)) => Lookup::Hit(schema),
            Lookup::InProgress => Lookup::InProgress,
            Lookup::Hit(CachedEntry::Values(_)) | Lookup::Miss => Lookup::Miss,
        }
    }

    /// Mark an entry as being computed by the current thread.
    ///
    /// Several threads may compute the same entry at once; each is
    /// recorded as an owner until it calls `set` or `abandon`.
    pub fn begin(&self, key: CacheKey) {
        let current = thread::current().id();
        let mut state = self.state();
        match state.slots.get_mut(&key) {
            Some(Slot::InProgress(owners)) => {
                owners.insert(current);
            }
            _ => {
                state
                    .slots
                    .insert(key, Slot::InProgress(HashSet::from([current])));
            }
        }
    }

    /// Give up computing an entry on the current thread.
    ///
    /// The slot is removed once no thread is computing it. A finished entry
    /// stored by another thread in the meantime is kept.
    pub fn abandon(&self, key: &CacheKey) {
        let current = thread::current().id();
        let mut state = self.state();
        if let Some(Slot::InProgress(owners)) = state.slots.get_mut(key) {
            owners.remove(&current);
            if owners.is_empty() {
                state.slots.remove(key);
            }
        }
    }

    /// Store a computed entry, replacing any previous state.
    pub fn set(&self, key: CacheKey, entry: CachedEntry) {
        self.state().slots.insert(key, Slot::Ready(entry));
    }

    /// Invalidate an entry. Also disarms its pending default merge.
    pub fn delete(&self, key: &CacheKey) {
        let mut state = self.state();
        state.slots.remove(key);
        state.pending_merge.remove(key);
    }

    /// Drop every entry and flag.
    pub fn clear(&self) {
        let mut state = self.state();
        state.slots.clear();
        state.pending_merge.clear();
    }

    /// Number of slots, including in-progress ones.
    pub fn len(&self) -> usize {
        self.state().slots.len()
    }

    /// Check if the cache holds no slots.
    pub fn is_empty(&self) -> bool {
        self.state().slots.is_empty()
    }

    /// Record that the values entry at `key` still needs defaults merged.
    pub fn arm_merge(&self, key: CacheKey) {
        self.state().pending_merge.insert(key);
    }

    /// Consume the pending-merge flag for `key`.
    ///
    /// Returns `true` exactly once per [`ResultCache::arm_merge`].
    pub fn take_merge(&self, key: &CacheKey) -> bool {
        self.state().pending_merge.remove(key)
    }

    /// Check whether a merge is pending without consuming it.
    pub fn merge_pending(&self, key: &CacheKey) -> bool {
        self.state().pending_merge.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values_key() -> CacheKey {
        CacheKey::new("theme", CacheDomain::Values, Some("42".into()))
    }

    #[test]
    fn test_key_display() {
        assert_eq!(values_key().to_string(), "optmodel:theme/values/42");
        let unscoped = CacheKey::new("theme", CacheDomain::Schema, None);
        assert_eq!(unscoped.to_string(), "optmodel:theme/options");
    }

    #[test]
    fn test_in_progress_then_set() {
        let cache = ResultCache::new();
        let key = CacheKey::new("theme", CacheDomain::Schema, None);

        cache.begin(key.clone());
        assert_eq!(cache.schema(&key), Lookup::InProgress);

        cache.set(key.clone(), CachedEntry::Schema(Arc::new(Schema::new())));
        assert_eq!(cache.schema(&key), Lookup::Hit(Arc::new(Schema::new())));
    }

    #[test]
    fn test_in_progress_is_private_to_computing_thread() {
        let cache = Arc::new(ResultCache::new());
        let key = CacheKey::new("theme", CacheDomain::Schema, None);
        cache.begin(key.clone());

        let seen = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || cache.schema(&key)).join().unwrap()
        };

        assert_eq!(seen, Lookup::Miss);
        assert_eq!(cache.schema(&key), Lookup::InProgress);
    }

    #[test]
    fn test_abandon_keeps_slot_for_other_owners() {
        let cache = Arc::new(ResultCache::new());
        let key = CacheKey::new("theme", CacheDomain::Schema, None);
        cache.begin(key.clone());

        {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || {
                cache.begin(key.clone());
                cache.abandon(&key);
            })
            .join()
            .unwrap();
        }
        assert_eq!(cache.schema(&key), Lookup::InProgress);

        cache.abandon(&key);
        assert_eq!(cache.schema(&key), Lookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_abandon_keeps_finished_entry() {
        let cache = ResultCache::new();
        let key = CacheKey::new("theme", CacheDomain::Schema, None);
        cache.begin(key.clone());
        cache.set(key.clone(), CachedEntry::Schema(Arc::new(Schema::new())));

        cache.abandon(&key);
        assert_eq!(cache.schema(&key), Lookup::Hit(Arc::new(Schema::new())));
    }

    #[test]
    fn test_empty_entry_is_a_hit() {
        let cache = ResultCache::new();
        cache.set(values_key(), CachedEntry::Values(ValueMap::new()));
        assert_eq!(cache.values(&values_key()), Lookup::Hit(ValueMap::new()));
    }

    #[test]
    fn test_kind_mismatch_is_a_miss() {
        let cache = ResultCache::new();
        let mut values = ValueMap::new();
        values.insert("a".into(), json!(1));
        cache.set(values_key(), CachedEntry::Values(values));
        assert_eq!(cache.schema(&values_key()), Lookup::Miss);
    }

    #[test]
    fn test_merge_flag_consumed_once() {
        let cache = ResultCache::new();
        cache.arm_merge(values_key());
        assert!(cache.merge_pending(&values_key()));
        assert!(cache.take_merge(&values_key()));
        assert!(!cache.take_merge(&values_key()));
    }

    #[test]
    fn test_delete_disarms_merge() {
        let cache = ResultCache::new();
        cache.set(values_key(), CachedEntry::Values(ValueMap::new()));
        cache.arm_merge(values_key());
        cache.delete(&values_key());
        assert!(!cache.merge_pending(&values_key()));
        assert!(cache.is_empty());
    }
}
