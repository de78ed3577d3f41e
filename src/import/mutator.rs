//! The store capability consumed by the import engine.

use crate::types::{DependencyEdge, Task};
use anyhow::Result;

/// Narrow write interface onto a task store.
///
/// The engine never sees a concrete store type. `run_in_transaction` hands
/// the closure a transactional view of the same capability; the store commits
/// when the closure returns `Ok` and rolls back on `Err`.
pub trait Mutator {
    fn task_exists(&self, id: &str) -> Result<bool>;

    /// Insert a new task with its labels and (optionally) dependency edges.
    fn create_task(&self, task: &Task, labels: &[String], deps: &[DependencyEdge]) -> Result<()>;

    /// Overwrite every importable field of an existing task.
    fn update_task(&self, task: &Task) -> Result<()>;

    /// Replace the task's label set wholesale.
    fn replace_labels(&self, id: &str, labels: &[String]) -> Result<()>;

    /// Drop every dependency edge owned by the task.
    fn remove_dependencies(&self, id: &str) -> Result<()>;

    fn add_dependency(&self, child_id: &str, parent_id: &str, dep_type: &str) -> Result<()>;

    fn run_in_transaction(&self, f: &mut dyn FnMut(&dyn Mutator) -> Result<()>) -> Result<()>;
}
