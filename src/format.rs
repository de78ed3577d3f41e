//! Output formatting for import summaries.

use crate::import::ImportResult;
use anyhow::Result;
use clap::ValueEnum;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Render an import result in the requested format.
pub fn format_import_result(
    result: &ImportResult,
    format: OutputFormat,
    dry_run: bool,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format_import_result_text(result, dry_run)),
    }
}

/// Format an import result as a plain-text summary.
pub fn format_import_result_text(result: &ImportResult, dry_run: bool) -> String {
    let mut out = String::new();

    if dry_run {
        out.push_str("Dry run: no changes were made.\n");
    }
    out.push_str(&format!(
        "created: {}, updated: {}, skipped: {}, errors: {}\n",
        result.created, result.updated, result.skipped, result.errors
    ));
    if let Some(mode) = result.apply_mode {
        out.push_str(&format!(
            "mode: {}, applied chunks: {}\n",
            mode, result.applied_chunks
        ));
    }

    if !result.messages.is_empty() {
        out.push_str("\nMessages:\n");
        for message in &result.messages {
            out.push_str(&format!("  - {}\n", message));
        }
    }

    out
}
