//! Task Graph Ingest Library
//!
//! Bulk import of task records into a task-graph store: record
//! normalization, dedupe and orphan policies, transactional or best-effort
//! application, and chunked streaming.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod import;
pub mod logging;
pub mod types;
