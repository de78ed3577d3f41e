//! Dependency edge resolution under an orphan policy.

use super::cache::ExistenceCache;
use super::mutator::Mutator;
use super::policy::OrphanHandling;
use crate::error::ImportError;
use crate::types::DependencyEdge;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Outcome of resolving one record's declared edges.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Edges to write.
    pub edges: Vec<DependencyEdge>,
    /// Parents that resolved neither in the batch nor in the store.
    pub orphans: Vec<String>,
    /// Under `strict`, any orphan rejects every edge of the record.
    pub rejected: bool,
}

/// Filter `edges` for one record.
///
/// `batch_ids` holds every ID present anywhere in the current batch, which
/// is what lets a record depend on a task declared after it. `cancel` is
/// checked before every existence lookup.
pub fn resolve_edges(
    edges: &[DependencyEdge],
    batch_ids: &HashSet<String>,
    policy: OrphanHandling,
    cache: &mut ExistenceCache,
    store: &dyn Mutator,
    cancel: &CancellationToken,
) -> Result<Resolution, ImportError> {
    if policy == OrphanHandling::Allow {
        return Ok(Resolution {
            edges: edges.to_vec(),
            ..Default::default()
        });
    }

    let mut resolution = Resolution::default();
    for edge in edges {
        let known = if batch_ids.contains(&edge.parent_id) {
            true
        } else {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            cache.exists(store, &edge.parent_id)?
        };
        if known {
            resolution.edges.push(edge.clone());
        } else {
            resolution.orphans.push(edge.parent_id.clone());
        }
    }

    if policy == OrphanHandling::Strict && !resolution.orphans.is_empty() {
        resolution.rejected = true;
        resolution.edges.clear();
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::memory::{MemoryStore, task};

    fn resolve(
        edges: &[DependencyEdge],
        batch: &HashSet<String>,
        policy: OrphanHandling,
        cache: &mut ExistenceCache,
        store: &MemoryStore,
    ) -> Resolution {
        resolve_edges(edges, batch, policy, cache, store, &CancellationToken::new()).unwrap()
    }

    fn setup() -> (MemoryStore, HashSet<String>, Vec<DependencyEdge>) {
        let store = MemoryStore::new();
        store.insert(task("bd-stored"));
        let batch: HashSet<String> = ["bd-child", "bd-batch"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let edges = vec![
            DependencyEdge::new("bd-stored", "blocks"),
            DependencyEdge::new("bd-batch", "blocks"),
            DependencyEdge::new("bd-ghost", "related"),
        ];
        (store, batch, edges)
    }

    #[test]
    fn test_allow_keeps_everything_without_lookups() {
        let (store, batch, edges) = setup();
        let mut cache = ExistenceCache::new();
        let res = resolve(&edges, &batch, OrphanHandling::Allow, &mut cache, &store);
        assert_eq!(res.edges, edges);
        assert!(res.orphans.is_empty());
        assert!(!res.rejected);
        assert_eq!(cache.store_lookups(), 0);
    }

    #[test]
    fn test_skip_drops_only_the_orphan() {
        let (store, batch, edges) = setup();
        let mut cache = ExistenceCache::new();
        let res = resolve(&edges, &batch, OrphanHandling::Skip, &mut cache, &store);
        assert_eq!(res.edges, edges[..2].to_vec());
        assert_eq!(res.orphans, vec!["bd-ghost".to_string()]);
        assert!(!res.rejected);
    }

    #[test]
    fn test_strict_rejects_whole_record() {
        let (store, batch, edges) = setup();
        let mut cache = ExistenceCache::new();
        let res = resolve(&edges, &batch, OrphanHandling::Strict, &mut cache, &store);
        assert!(res.edges.is_empty());
        assert_eq!(res.orphans, vec!["bd-ghost".to_string()]);
        assert!(res.rejected);
    }

    #[test]
    fn test_batch_ids_short_circuit_store_lookup() {
        let (store, batch, _) = setup();
        let mut cache = ExistenceCache::new();
        let edges = vec![DependencyEdge::new("bd-batch", "blocks")];
        let res = resolve(&edges, &batch, OrphanHandling::Strict, &mut cache, &store);
        assert_eq!(res.edges.len(), 1);
        assert_eq!(cache.store_lookups(), 0);
    }

    #[test]
    fn test_cancelled_token_stops_lookups() {
        let (store, batch, edges) = setup();
        let mut cache = ExistenceCache::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = resolve_edges(&edges, &batch, OrphanHandling::Skip, &mut cache, &store, &token)
            .unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
        assert_eq!(cache.store_lookups(), 0);
    }
}
