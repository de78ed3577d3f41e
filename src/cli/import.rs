//! Import subcommand for task-graph-ingest
//!
//! Reads task records from a JSON array or NDJSON file (optionally gzipped,
//! or `-` for stdin) and merges them into the database.

use crate::config::ImportConfig;
use crate::format::OutputFormat;
use crate::import::stream::{InputFormat, StreamLimits};
use crate::import::{DedupePolicy, ImportPolicy, OrphanHandling};
use anyhow::{Context, Result};
use clap::Args;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the file to import, or `-` for stdin
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// What to do when a record's ID already exists: skip, overwrite, error
    #[arg(long)]
    pub dedupe: Option<DedupePolicy>,

    /// What to do with dependencies on unknown tasks: allow, skip, strict
    #[arg(long = "orphans")]
    pub orphan_handling: Option<OrphanHandling>,

    /// Validate and classify records without modifying the database
    #[arg(long)]
    pub dry_run: bool,

    /// Apply each chunk in a single transaction (all-or-nothing per chunk)
    #[arg(long)]
    pub atomic: bool,

    /// Records per chunk for NDJSON input
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Input framing
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Output format for the summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl ImportArgs {
    /// Check if this is a gzipped file based on extension
    pub fn is_gzipped(&self) -> bool {
        self.file.extension().is_some_and(|ext| ext == "gz")
    }

    pub fn is_stdin(&self) -> bool {
        self.file.as_os_str() == "-"
    }

    /// Open the import source, transparently decompressing `.gz` files.
    pub fn open_input(&self) -> Result<Box<dyn BufRead + Send>> {
        let raw: Box<dyn Read + Send> = if self.is_stdin() {
            Box::new(std::io::stdin())
        } else {
            let file = File::open(&self.file)
                .with_context(|| format!("Failed to open {}", self.file.display()))?;
            Box::new(file)
        };

        if self.is_gzipped() {
            Ok(Box::new(BufReader::new(GzDecoder::new(raw))))
        } else {
            Ok(Box::new(BufReader::new(raw)))
        }
    }

    /// Merge command-line flags over configured defaults.
    pub fn policy(&self, defaults: &ImportConfig) -> ImportPolicy {
        let mut policy = defaults.policy();
        if let Some(dedupe) = self.dedupe {
            policy.dedupe = dedupe;
        }
        if let Some(orphans) = self.orphan_handling {
            policy.orphan_handling = orphans;
        }
        policy.dry_run = self.dry_run;
        policy.atomic |= self.atomic;
        policy
    }

    pub fn limits(&self, defaults: &ImportConfig) -> StreamLimits {
        StreamLimits {
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            ..defaults.limits()
        }
    }
}
