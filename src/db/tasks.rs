//! Task rows and their label sets.

use super::Database;
use crate::types::{Task, TaskStatus, TaskType};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;

const TASK_COLUMNS: &str = "id, title, description, design, acceptance_criteria, notes, \
     assignee, external_ref, status, task_type, priority, parent_id, custom, \
     created_at, updated_at, closed_at";

fn custom_to_sql(task: &Task) -> Result<Option<String>> {
    if task.custom.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(&task.custom)?))
    }
}

fn text_column_error(idx: usize, err: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        err.to_string().into(),
    )
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let task_type: String = row.get("task_type")?;
    let custom: Option<String> = row.get("custom")?;

    let custom = match custom {
        Some(json) => serde_json::from_str(&json).map_err(|e| text_column_error(12, e))?,
        None => BTreeMap::new(),
    };

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        design: row.get("design")?,
        acceptance_criteria: row.get("acceptance_criteria")?,
        notes: row.get("notes")?,
        assignee: row.get("assignee")?,
        external_ref: row.get("external_ref")?,
        status: status
            .parse::<TaskStatus>()
            .map_err(|e| text_column_error(8, e))?,
        task_type: task_type
            .parse::<TaskType>()
            .map_err(|e| text_column_error(9, e))?,
        priority: row.get("priority")?,
        parent_id: row.get("parent_id")?,
        custom,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        closed_at: row.get("closed_at")?,
    })
}

pub(crate) fn task_exists_in(conn: &Connection, task_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM tasks WHERE id = ?1",
            params![task_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            TASK_COLUMNS
        ),
        params![
            task.id,
            task.title,
            task.description,
            task.design,
            task.acceptance_criteria,
            task.notes,
            task.assignee,
            task.external_ref,
            task.status.as_str(),
            task.task_type.as_str(),
            task.priority,
            task.parent_id,
            custom_to_sql(task)?,
            task.created_at,
            task.updated_at,
            task.closed_at,
        ],
    )?;
    Ok(())
}

/// Overwrite every column of an existing row.
pub(crate) fn overwrite_task(conn: &Connection, task: &Task) -> Result<()> {
    let changed = conn.execute(
        "UPDATE tasks SET title = ?2, description = ?3, design = ?4, acceptance_criteria = ?5,
                notes = ?6, assignee = ?7, external_ref = ?8, status = ?9, task_type = ?10,
                priority = ?11, parent_id = ?12, custom = ?13, created_at = ?14,
                updated_at = ?15, closed_at = ?16
         WHERE id = ?1",
        params![
            task.id,
            task.title,
            task.description,
            task.design,
            task.acceptance_criteria,
            task.notes,
            task.assignee,
            task.external_ref,
            task.status.as_str(),
            task.task_type.as_str(),
            task.priority,
            task.parent_id,
            custom_to_sql(task)?,
            task.created_at,
            task.updated_at,
            task.closed_at,
        ],
    )?;
    if changed == 0 {
        return Err(anyhow!("Task not found: {}", task.id));
    }
    Ok(())
}

/// Sync labels to the task_labels junction table.
/// Replaces all existing labels for the task.
pub(crate) fn sync_task_labels(conn: &Connection, task_id: &str, labels: &[String]) -> Result<()> {
    conn.execute(
        "DELETE FROM task_labels WHERE task_id = ?1",
        params![task_id],
    )?;
    for label in labels {
        conn.execute(
            "INSERT OR IGNORE INTO task_labels (task_id, label) VALUES (?1, ?2)",
            params![task_id, label],
        )?;
    }
    Ok(())
}

impl Database {
    pub fn task_exists(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| task_exists_in(conn, task_id))
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                    params![task_id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// Labels of a task, sorted.
    pub fn get_labels(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT label FROM task_labels WHERE task_id = ?1 ORDER BY label COLLATE NOCASE",
            )?;
            let labels = stmt
                .query_map(params![task_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(labels)
        })
    }

    pub fn count_tasks(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}
