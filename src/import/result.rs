//! Aggregated outcome of an import run.

use super::policy::ApplyMode;
use serde::{Deserialize, Serialize};

/// Counts, touched IDs and diagnostics of one or more import invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Created, updated and skipped task IDs in input order.
    pub task_ids: Vec<String>,
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_mode: Option<ApplyMode>,
    /// Invocations that committed (0 for a dry run).
    pub applied_chunks: usize,
}

impl ImportResult {
    pub fn new(apply_mode: ApplyMode) -> Self {
        Self {
            apply_mode: Some(apply_mode),
            ..Default::default()
        }
    }

    /// Fold another invocation's result into this one.
    pub fn absorb(&mut self, other: ImportResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.task_ids.extend(other.task_ids);
        self.messages.extend(other.messages);
        self.apply_mode = self.apply_mode.or(other.apply_mode);
        self.applied_chunks += other.applied_chunks;
    }

    /// Total records that reached a classified outcome.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.errors
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.errors += 1;
        self.messages.push(message);
    }
}
