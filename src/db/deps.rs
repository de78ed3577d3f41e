//! Dependency edge rows.

use super::Database;
use crate::types::DependencyEdge;
use anyhow::Result;
use rusqlite::{Connection, params};

/// Add an edge (task depends on parent). Re-adding an edge updates its type.
///
/// Self-dependencies violate a CHECK constraint and surface as errors.
pub(crate) fn insert_dependency(
    conn: &Connection,
    task_id: &str,
    parent_id: &str,
    dep_type: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO dependencies (task_id, parent_id, dep_type) VALUES (?1, ?2, ?3)
         ON CONFLICT(task_id, parent_id) DO UPDATE SET dep_type = excluded.dep_type",
        params![task_id, parent_id, dep_type],
    )?;
    Ok(())
}

pub(crate) fn delete_dependencies(conn: &Connection, task_id: &str) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM dependencies WHERE task_id = ?1",
        params![task_id],
    )?;
    Ok(removed)
}

impl Database {
    /// Edges owned by a task, ordered by parent ID.
    pub fn get_dependencies(&self, task_id: &str) -> Result<Vec<DependencyEdge>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT parent_id, dep_type FROM dependencies WHERE task_id = ?1 ORDER BY parent_id",
            )?;

            let deps = stmt
                .query_map(params![task_id], |row| {
                    Ok(DependencyEdge {
                        parent_id: row.get(0)?,
                        dep_type: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(deps)
        })
    }

    /// Total number of dependency rows.
    pub fn count_dependencies(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM dependencies", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}
