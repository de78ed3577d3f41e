//! `Mutator` implementation over a SQLite connection.

use super::deps::{delete_dependencies, insert_dependency};
use super::tasks::{insert_task, overwrite_task, sync_task_labels, task_exists_in};
use crate::import::Mutator;
use crate::types::{DependencyEdge, Task};
use anyhow::Result;
use rusqlite::Connection;

/// Store capability backed by a borrowed connection.
///
/// Outside a transaction every call autocommits. `run_in_transaction`
/// opens one transaction; nested calls join the outer one.
pub struct SqliteMutator<'c> {
    conn: &'c Connection,
    in_transaction: bool,
}

impl<'c> SqliteMutator<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }
}

impl Mutator for SqliteMutator<'_> {
    fn task_exists(&self, id: &str) -> Result<bool> {
        task_exists_in(self.conn, id)
    }

    fn create_task(&self, task: &Task, labels: &[String], deps: &[DependencyEdge]) -> Result<()> {
        insert_task(self.conn, task)?;
        sync_task_labels(self.conn, &task.id, labels)?;
        for dep in deps {
            insert_dependency(self.conn, &task.id, &dep.parent_id, &dep.dep_type)?;
        }
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        overwrite_task(self.conn, task)
    }

    fn replace_labels(&self, id: &str, labels: &[String]) -> Result<()> {
        sync_task_labels(self.conn, id, labels)
    }

    fn remove_dependencies(&self, id: &str) -> Result<()> {
        delete_dependencies(self.conn, id)?;
        Ok(())
    }

    fn add_dependency(&self, child_id: &str, parent_id: &str, dep_type: &str) -> Result<()> {
        insert_dependency(self.conn, child_id, parent_id, dep_type)
    }

    fn run_in_transaction(&self, f: &mut dyn FnMut(&dyn Mutator) -> Result<()>) -> Result<()> {
        if self.in_transaction {
            return f(self);
        }

        // Dropping the transaction without commit rolls it back.
        let tx = self.conn.unchecked_transaction()?;
        let inner = SqliteMutator {
            conn: &tx,
            in_transaction: true,
        };
        f(&inner)?;
        tx.commit()?;
        Ok(())
    }
}
