//! Validation and canonicalization of raw import records.

use crate::error::ImportError;
use crate::types::{
    DEFAULT_DEP_TYPE, DependencyEdge, ImportRecord, MAX_TASK_ID_LEN, PRIORITY_DEFAULT,
    PRIORITY_MAX, PRIORITY_MIN, Priority, Task, TaskStatus, TaskType,
};
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static TASK_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-[A-Za-z0-9]+(\.[0-9]+)*$").expect("valid task id regex")
});

/// A record that passed validation, ready for the upsert phase.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub task: Task,
    /// `None` when the caller did not supply labels.
    pub labels: Option<Vec<String>>,
    pub deps: Vec<DependencyEdge>,
}

/// Check a task ID against the store's ID shape.
pub fn is_valid_task_id(id: &str) -> bool {
    id.len() <= MAX_TASK_ID_LEN && TASK_ID_PATTERN.is_match(id)
}

/// Normalize one raw record.
///
/// Returns `Ok(None)` when the ID or title is blank after trimming; the
/// caller counts that as a soft error. Every other defect is a hard error.
pub fn normalize_record(
    index: usize,
    raw: ImportRecord,
    now: DateTime<Utc>,
) -> Result<Option<NormalizedRecord>, ImportError> {
    let id = raw.id.trim();
    let title = raw.title.trim();
    if id.is_empty() || title.is_empty() {
        return Ok(None);
    }
    if !is_valid_task_id(id) {
        return Err(ImportError::invalid(
            index,
            "id",
            format!("'{}' is not a valid task id", id),
        ));
    }

    let status = match non_blank(raw.status.as_deref()) {
        Some(s) => s
            .parse::<TaskStatus>()
            .map_err(|e| ImportError::invalid(index, "status", e))?,
        None => TaskStatus::default(),
    };
    let task_type = match non_blank(raw.task_type.as_deref()) {
        Some(s) => s
            .parse::<TaskType>()
            .map_err(|e| ImportError::invalid(index, "type", e))?,
        None => TaskType::default(),
    };
    let priority = match raw.priority {
        Some(p) if (PRIORITY_MIN as i64..=PRIORITY_MAX as i64).contains(&p) => p as Priority,
        Some(p) => {
            return Err(ImportError::invalid(
                index,
                "priority",
                format!(
                    "{} is outside {}..={}",
                    p, PRIORITY_MIN, PRIORITY_MAX
                ),
            ));
        }
        None => PRIORITY_DEFAULT,
    };

    let parent_id = match non_blank(raw.parent_id.as_deref()) {
        Some(parent) if is_valid_task_id(parent) => Some(parent.to_string()),
        Some(parent) => {
            return Err(ImportError::invalid(
                index,
                "parent_id",
                format!("'{}' is not a valid task id", parent),
            ));
        }
        None => None,
    };

    let labels = raw
        .labels
        .map(|labels| normalize_labels(index, labels))
        .transpose()?;

    let mut deps = Vec::with_capacity(raw.deps.len());
    for dep in raw.deps {
        let parent = dep.parent_id.trim();
        if !is_valid_task_id(parent) {
            return Err(ImportError::invalid(
                index,
                "dependency",
                format!("parent id '{}' is not a valid task id", parent),
            ));
        }
        let dep_type = match dep.dep_type.trim() {
            "" => DEFAULT_DEP_TYPE,
            t => t,
        };
        deps.push(DependencyEdge::new(parent, dep_type));
    }

    let created_at = raw.created_at.unwrap_or(now).timestamp_millis();
    let updated_at = raw
        .updated_at
        .map(|t| t.timestamp_millis())
        .unwrap_or(created_at);
    let closed_at = if status.is_closed() {
        Some(
            raw.closed_at
                .map(|t| t.timestamp_millis())
                .unwrap_or(updated_at),
        )
    } else {
        None
    };

    Ok(Some(NormalizedRecord {
        task: Task {
            id: id.to_string(),
            title: title.to_string(),
            description: raw.description,
            design: raw.design,
            acceptance_criteria: raw.acceptance_criteria,
            notes: raw.notes,
            assignee: non_blank(raw.assignee.as_deref()).map(String::from),
            external_ref: non_blank(raw.external_ref.as_deref()).map(String::from),
            status,
            task_type,
            priority,
            parent_id,
            custom: raw.custom,
            created_at,
            updated_at,
            closed_at,
        },
        labels,
        deps,
    }))
}

/// Dedupe case-insensitively (first spelling wins) and sort.
fn normalize_labels(index: usize, labels: Vec<String>) -> Result<Vec<String>, ImportError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        if !label.is_ascii() || label.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(ImportError::invalid(
                index,
                "label",
                format!("'{}' must be ASCII without whitespace", label),
            ));
        }
        if seen.insert(label.to_ascii_lowercase()) {
            out.push(label.to_string());
        }
    }
    out.sort_by_key(|l| l.to_ascii_lowercase());
    Ok(out)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
