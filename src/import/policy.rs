//! Per-run import policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a record's ID already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupePolicy {
    /// Leave the stored task untouched.
    #[default]
    Skip,
    /// Overwrite every field, replace labels and dependencies.
    Overwrite,
    /// Count the record as an error.
    Error,
}

impl fmt::Display for DedupePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Error => "error",
        };
        write!(f, "{value}")
    }
}

impl FromStr for DedupePolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "Invalid dedupe policy: {other}. Must be one of: skip, overwrite, error"
            )),
        }
    }
}

/// What to do with a dependency whose parent is neither stored nor in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanHandling {
    /// Write the edge anyway; no existence check.
    #[default]
    Allow,
    /// Drop just the orphaned edge.
    Skip,
    /// Reject every edge of the record.
    Strict,
}

impl fmt::Display for OrphanHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Allow => "allow",
            Self::Skip => "skip",
            Self::Strict => "strict",
        };
        write!(f, "{value}")
    }
}

impl FromStr for OrphanHandling {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "skip" => Ok(Self::Skip),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "Invalid orphan handling: {other}. Must be one of: allow, skip, strict"
            )),
        }
    }
}

/// How the mutations of one invocation were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    Atomic,
    BestEffort,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic => write!(f, "atomic"),
            Self::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Policy flags for one import invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportPolicy {
    #[serde(default)]
    pub dedupe: DedupePolicy,
    #[serde(default)]
    pub orphan_handling: OrphanHandling,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub atomic: bool,
}

impl ImportPolicy {
    pub fn with_dedupe(mut self, dedupe: DedupePolicy) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_orphans(mut self, orphan_handling: OrphanHandling) -> Self {
        self.orphan_handling = orphan_handling;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn apply_mode(&self) -> ApplyMode {
        if self.atomic {
            ApplyMode::Atomic
        } else {
            ApplyMode::BestEffort
        }
    }
}
