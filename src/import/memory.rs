//! In-memory `Mutator` used by the engine's unit tests.

use super::mutator::Mutator;
use crate::types::{DependencyEdge, PRIORITY_DEFAULT, Task, TaskStatus, TaskType};
use anyhow::{Result, anyhow};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    pub tasks: BTreeMap<String, Task>,
    pub labels: BTreeMap<String, BTreeSet<String>>,
    pub deps: BTreeMap<String, Vec<DependencyEdge>>,
}

/// Store fake with snapshot-based transactions and failure injection.
#[derive(Default)]
pub struct MemoryStore {
    state: RefCell<MemoryState>,
    writes: Cell<usize>,
    fail_create: RefCell<Option<String>>,
    cancel_on_create: RefCell<Option<(String, CancellationToken)>>,
    lookups: Cell<usize>,
    cancel_on_lookup: RefCell<Option<(usize, CancellationToken)>>,
    in_transaction: Cell<bool>,
}

pub fn task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {}", id),
        description: None,
        design: None,
        acceptance_criteria: None,
        notes: None,
        assignee: None,
        external_ref: None,
        status: TaskStatus::Open,
        task_type: TaskType::Task,
        priority: PRIORITY_DEFAULT,
        parent_id: None,
        custom: BTreeMap::new(),
        created_at: 1,
        updated_at: 1,
        closed_at: None,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        self.state.borrow_mut().tasks.insert(task.id.clone(), task);
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.borrow().clone()
    }

    /// Mutating calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn fail_create_of(&self, id: &str) {
        *self.fail_create.borrow_mut() = Some(id.to_string());
    }

    pub fn cancel_after_create_of(&self, id: &str, token: CancellationToken) {
        *self.cancel_on_create.borrow_mut() = Some((id.to_string(), token));
    }

    /// Cancel `token` while answering the `n`th existence lookup.
    pub fn cancel_on_lookup(&self, n: usize, token: CancellationToken) {
        *self.cancel_on_lookup.borrow_mut() = Some((n, token));
    }

    /// Existence lookups that reached the store.
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn labels_of(&self, id: &str) -> Vec<String> {
        self.state
            .borrow()
            .labels
            .get(id)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn deps_of(&self, id: &str) -> Vec<DependencyEdge> {
        self.state.borrow().deps.get(id).cloned().unwrap_or_default()
    }

    fn write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

impl Mutator for MemoryStore {
    fn task_exists(&self, id: &str) -> Result<bool> {
        self.lookups.set(self.lookups.get() + 1);
        if let Some((n, token)) = self.cancel_on_lookup.borrow().as_ref()
            && *n == self.lookups.get()
        {
            token.cancel();
        }
        Ok(self.state.borrow().tasks.contains_key(id))
    }

    fn create_task(&self, task: &Task, labels: &[String], deps: &[DependencyEdge]) -> Result<()> {
        self.write();
        if self.fail_create.borrow().as_deref() == Some(task.id.as_str()) {
            return Err(anyhow!("injected failure creating {}", task.id));
        }
        let mut state = self.state.borrow_mut();
        if state.tasks.contains_key(&task.id) {
            return Err(anyhow!("task {} already exists", task.id));
        }
        state.tasks.insert(task.id.clone(), task.clone());
        state
            .labels
            .insert(task.id.clone(), labels.iter().cloned().collect());
        state.deps.insert(task.id.clone(), deps.to_vec());
        drop(state);

        if let Some((id, token)) = self.cancel_on_create.borrow().as_ref()
            && *id == task.id
        {
            token.cancel();
        }
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        self.write();
        let mut state = self.state.borrow_mut();
        let slot = state
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| anyhow!("task {} not found", task.id))?;
        *slot = task.clone();
        Ok(())
    }

    fn replace_labels(&self, id: &str, labels: &[String]) -> Result<()> {
        self.write();
        self.state
            .borrow_mut()
            .labels
            .insert(id.to_string(), labels.iter().cloned().collect());
        Ok(())
    }

    fn remove_dependencies(&self, id: &str) -> Result<()> {
        self.write();
        self.state.borrow_mut().deps.remove(id);
        Ok(())
    }

    fn add_dependency(&self, child_id: &str, parent_id: &str, dep_type: &str) -> Result<()> {
        self.write();
        if child_id == parent_id {
            return Err(anyhow!("task {} cannot depend on itself", child_id));
        }
        let mut state = self.state.borrow_mut();
        let edges = state.deps.entry(child_id.to_string()).or_default();
        if !edges.iter().any(|e| e.parent_id == parent_id) {
            edges.push(DependencyEdge::new(parent_id, dep_type));
        }
        Ok(())
    }

    fn run_in_transaction(&self, f: &mut dyn FnMut(&dyn Mutator) -> Result<()>) -> Result<()> {
        if self.in_transaction.get() {
            return f(self);
        }
        let before = self.snapshot();
        self.in_transaction.set(true);
        let outcome = f(self);
        self.in_transaction.set(false);
        if outcome.is_err() {
            *self.state.borrow_mut() = before;
        }
        outcome
    }
}
