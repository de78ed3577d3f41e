//! Per-run memo of task existence.

use super::mutator::Mutator;
use anyhow::Result;
use std::collections::HashMap;

/// Remembers "does task X exist" answers for the lifetime of one run.
///
/// The first lookup for an ID asks the store; later lookups are served from
/// memory. IDs the run creates are marked existing as soon as the create is
/// decided, dry run included, so later records can depend on them.
#[derive(Debug, Default)]
pub struct ExistenceCache {
    known: HashMap<String, bool>,
    store_lookups: usize,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&mut self, store: &dyn Mutator, id: &str) -> Result<bool> {
        if let Some(&exists) = self.known.get(id) {
            return Ok(exists);
        }
        let exists = store.task_exists(id)?;
        self.store_lookups += 1;
        self.known.insert(id.to_string(), exists);
        Ok(exists)
    }

    pub fn mark_existing(&mut self, id: &str) {
        self.known.insert(id.to_string(), true);
    }

    /// Number of lookups that reached the store.
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::memory::{MemoryStore, task};

    #[test]
    fn test_memoizes_store_answers() {
        let store = MemoryStore::new();
        store.insert(task("bd-1"));
        let mut cache = ExistenceCache::new();

        assert!(cache.exists(&store, "bd-1").unwrap());
        assert!(cache.exists(&store, "bd-1").unwrap());
        assert!(!cache.exists(&store, "bd-2").unwrap());
        assert!(!cache.exists(&store, "bd-2").unwrap());
        assert_eq!(cache.store_lookups(), 2);
    }

    #[test]
    fn test_marked_ids_exist_without_store() {
        let store = MemoryStore::new();
        let mut cache = ExistenceCache::new();
        assert!(!cache.exists(&store, "bd-new").unwrap());

        cache.mark_existing("bd-new");
        assert!(cache.exists(&store, "bd-new").unwrap());
        assert!(!store.task_exists("bd-new").unwrap());
        assert_eq!(cache.store_lookups(), 1);
    }
}
