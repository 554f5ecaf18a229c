//! In-memory key-value store with a manual clock.
//!
//! Backs tests and embedded deployments that have no external cache.
//! Time only moves when [`MemoryStore::advance`] is called, which makes
//! retention and cooldown behavior testable without sleeping.

use super::{KvStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
struct Slot {
    list: Vec<String>,
    value: Option<String>,
    /// Clock-seconds deadline; `None` means no expiry.
    expires_at: Option<i64>,
}

pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    /// Manual clock, in seconds since store creation.
    clock: AtomicI64,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock: AtomicI64::new(0),
            unavailable: false,
        }
    }

    /// A store whose every operation fails, for outage-path tests.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Moves the manual clock forward.
    pub fn advance(&self, seconds: i64) {
        self.clock.fetch_add(seconds, Ordering::SeqCst);
    }

    fn now(&self) -> i64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_slots<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Slot>, i64) -> T,
    ) -> Result<T, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        slots.retain(|_, slot| slot.expires_at.is_none_or(|deadline| deadline > now));
        Ok(f(&mut slots, now))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn list_push_front(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_slots(|slots, _| {
            slots
                .entry(key.to_string())
                .or_default()
                .list
                .insert(0, value.to_string());
        })
    }

    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.with_slots(|slots, _| {
            let Some(slot) = slots.get(key) else {
                return Vec::new();
            };
            let len = slot.list.len() as i64;
            let resolve = |idx: i64| if idx < 0 { len + idx } else { idx };
            let from = resolve(start).max(0);
            let to = resolve(stop).min(len - 1);
            if from > to || len == 0 {
                return Vec::new();
            }
            slot.list[from as usize..=to as usize].to_vec()
        })
    }

    fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.with_slots(|slots, now| {
            if let Some(slot) = slots.get_mut(key) {
                slot.expires_at = Some(now + ttl_seconds as i64);
            }
        })
    }

    fn set_nx_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        self.with_slots(|slots, now| {
            if slots.get(key).is_some_and(|slot| slot.value.is_some()) {
                return false;
            }
            let slot = slots.entry(key.to_string()).or_default();
            slot.value = Some(value.to_string());
            slot.expires_at = Some(now + ttl_seconds as i64);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_front_order() {
        let store = MemoryStore::new();
        store.list_push_front("k", "a").unwrap();
        store.list_push_front("k", "b").unwrap();
        assert_eq!(store.list_range("k", 0, -1).unwrap(), ["b", "a"]);
    }

    #[test]
    fn test_range_bounds() {
        let store = MemoryStore::new();
        for v in ["c", "b", "a"] {
            store.list_push_front("k", v).unwrap();
        }
        assert_eq!(store.list_range("k", 0, 0).unwrap(), ["a"]);
        assert_eq!(store.list_range("k", 1, -1).unwrap(), ["b", "c"]);
        assert!(store.list_range("k", 5, 9).unwrap().is_empty());
        assert!(store.list_range("missing", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn test_expiry() {
        let store = MemoryStore::new();
        store.list_push_front("k", "v").unwrap();
        store.expire("k", 60).unwrap();
        store.advance(59);
        assert_eq!(store.list_range("k", 0, -1).unwrap().len(), 1);
        store.advance(2);
        assert!(store.list_range("k", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn test_set_nx_semantics() {
        let store = MemoryStore::new();
        assert!(store.set_nx_with_ttl("lock", "1", 30).unwrap());
        assert!(!store.set_nx_with_ttl("lock", "1", 30).unwrap());
        store.advance(31);
        assert!(store.set_nx_with_ttl("lock", "1", 30).unwrap());
    }

    #[test]
    fn test_unavailable_store() {
        let store = MemoryStore::unavailable();
        assert!(store.list_push_front("k", "v").is_err());
        assert!(store.list_range("k", 0, -1).is_err());
        assert!(store.expire("k", 1).is_err());
        assert!(store.set_nx_with_ttl("k", "v", 1).is_err());
    }
}
