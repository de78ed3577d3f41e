//! Bulk import engine.
//!
//! One invocation runs three steps over a batch of raw records:
//! 1. Normalize every record (a malformed record aborts before any write)
//! 2. Upsert phase: create, overwrite, skip or reject each record by ID
//! 3. Dependency phase: resolve and write edges for created/updated records
//!
//! With `atomic` the two write phases share one store transaction. Streaming
//! callers run one invocation per chunk and fold the results with
//! [`ImportResult::absorb`].

pub mod cache;
#[cfg(test)]
pub(crate) mod memory;
pub mod mutator;
pub mod normalize;
pub mod policy;
pub mod resolve;
pub mod result;
pub mod stream;

pub use cache::ExistenceCache;
pub use mutator::Mutator;
pub use normalize::{NormalizedRecord, is_valid_task_id, normalize_record};
pub use policy::{ApplyMode, DedupePolicy, ImportPolicy, OrphanHandling};
pub use result::ImportResult;

use crate::error::ImportError;
use crate::types::ImportRecord;
use anyhow::Context;
use chrono::Utc;
use resolve::resolve_edges;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Phase-1 outcome of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    None,
    Created,
    Updated,
    Skipped,
    Error,
}

/// Runs import invocations against a borrowed store.
pub struct Importer<'m> {
    store: &'m dyn Mutator,
    cancel: CancellationToken,
}

impl<'m> Importer<'m> {
    pub fn new(store: &'m dyn Mutator) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop issuing store calls once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Import one batch of records.
    ///
    /// Abort errors (validation, store failure, cancellation) return `Err`
    /// with no partial result. Under `atomic` every write of this call is
    /// rolled back; otherwise writes made before the failure stay.
    pub fn run(
        &self,
        records: Vec<ImportRecord>,
        policy: &ImportPolicy,
    ) -> Result<ImportResult, ImportError> {
        let mut run = ImportRun::new(*policy, self.cancel.clone());

        let now = Utc::now();
        for (index, raw) in records.into_iter().enumerate() {
            match normalize_record(index, raw, now)? {
                Some(record) => run.push(record),
                None => {
                    warn!(index, "Import record missing id or title");
                    run.result
                        .record_error(format!("record {}: missing id or title", index));
                }
            }
        }

        if policy.atomic && !policy.dry_run {
            self.store.run_in_transaction(&mut |tx: &dyn Mutator| {
                run.apply(tx).map_err(anyhow::Error::from)
            })?;
        } else {
            run.apply(self.store)?;
        }

        let mut result = run.result;
        if !policy.dry_run {
            result.applied_chunks = 1;
        }

        info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors,
            mode = %policy.apply_mode(),
            dry_run = policy.dry_run,
            "Import batch finished"
        );
        Ok(result)
    }
}

/// Import one batch with no cancellation.
pub fn import(
    store: &dyn Mutator,
    records: Vec<ImportRecord>,
    policy: &ImportPolicy,
) -> Result<ImportResult, ImportError> {
    Importer::new(store).run(records, policy)
}

/// State that lives for exactly one invocation.
struct ImportRun {
    policy: ImportPolicy,
    cancel: CancellationToken,
    records: Vec<NormalizedRecord>,
    outcomes: Vec<Outcome>,
    batch_ids: HashSet<String>,
    cache: ExistenceCache,
    result: ImportResult,
}

impl ImportRun {
    fn new(policy: ImportPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel,
            records: Vec::new(),
            outcomes: Vec::new(),
            batch_ids: HashSet::new(),
            cache: ExistenceCache::new(),
            result: ImportResult::new(policy.apply_mode()),
        }
    }

    fn push(&mut self, record: NormalizedRecord) {
        self.batch_ids.insert(record.task.id.clone());
        self.records.push(record);
        self.outcomes.push(Outcome::None);
    }

    fn apply(&mut self, store: &dyn Mutator) -> Result<(), ImportError> {
        self.upsert_phase(store)?;
        self.dependency_phase(store)
    }

    fn ensure_active(&self) -> Result<(), ImportError> {
        if self.cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    fn upsert_phase(&mut self, store: &dyn Mutator) -> Result<(), ImportError> {
        let dry_run = self.policy.dry_run;

        for i in 0..self.records.len() {
            self.ensure_active()?;
            let record = &self.records[i];
            let id = record.task.id.clone();

            let outcome = if !self.cache.exists(store, &id)? {
                if !dry_run {
                    self.ensure_active()?;
                    // Edges are written in the dependency phase, even for new tasks.
                    store
                        .create_task(&record.task, record.labels.as_deref().unwrap_or(&[]), &[])
                        .with_context(|| format!("creating task {}", id))?;
                }
                Outcome::Created
            } else {
                match self.policy.dedupe {
                    DedupePolicy::Skip => Outcome::Skipped,
                    DedupePolicy::Error => Outcome::Error,
                    DedupePolicy::Overwrite => {
                        if !dry_run {
                            self.ensure_active()?;
                            store
                                .update_task(&record.task)
                                .with_context(|| format!("updating task {}", id))?;
                            if let Some(labels) = &record.labels {
                                self.ensure_active()?;
                                store
                                    .replace_labels(&id, labels)
                                    .with_context(|| format!("replacing labels of {}", id))?;
                            }
                        }
                        Outcome::Updated
                    }
                }
            };

            debug!(task_id = %id, outcome = ?outcome, "Import record classified");
            match outcome {
                Outcome::Created => {
                    self.cache.mark_existing(&id);
                    self.result.created += 1;
                    self.result.task_ids.push(id);
                }
                Outcome::Updated => {
                    self.cache.mark_existing(&id);
                    self.result.updated += 1;
                    self.result.task_ids.push(id);
                }
                Outcome::Skipped => {
                    self.result.skipped += 1;
                    self.result
                        .messages
                        .push(format!("skipped existing id: {}", id));
                    self.result.task_ids.push(id);
                }
                Outcome::Error => {
                    warn!(task_id = %id, "Duplicate id rejected");
                    self.result.record_error(format!("duplicate id: {}", id));
                }
                Outcome::None => {}
            }
            self.outcomes[i] = outcome;
        }
        Ok(())
    }

    fn dependency_phase(&mut self, store: &dyn Mutator) -> Result<(), ImportError> {
        let dry_run = self.policy.dry_run;
        let orphans = self.policy.orphan_handling;

        for i in 0..self.records.len() {
            let outcome = self.outcomes[i];
            if !matches!(outcome, Outcome::Created | Outcome::Updated) {
                continue;
            }
            self.ensure_active()?;

            let record = &self.records[i];
            let id = record.task.id.as_str();
            let resolution = resolve_edges(
                &record.deps,
                &self.batch_ids,
                orphans,
                &mut self.cache,
                store,
                &self.cancel,
            )?;

            for parent in &resolution.orphans {
                warn!(task_id = %id, parent_id = %parent, policy = %orphans, "Orphan dependency");
                if orphans == OrphanHandling::Strict {
                    self.result
                        .record_error(format!("orphan dep: {} -> {}", id, parent));
                } else {
                    self.result
                        .messages
                        .push(format!("skipped orphan dep: {} -> {}", id, parent));
                }
            }

            if resolution.rejected || dry_run {
                continue;
            }

            if outcome == Outcome::Updated {
                self.ensure_active()?;
                store
                    .remove_dependencies(id)
                    .with_context(|| format!("clearing dependencies of {}", id))?;
            }
            for edge in &resolution.edges {
                self.ensure_active()?;
                store
                    .add_dependency(id, &edge.parent_id, &edge.dep_type)
                    .with_context(|| format!("adding dependency {} -> {}", id, edge.parent_id))?;
            }
        }
        Ok(())
    }
}
