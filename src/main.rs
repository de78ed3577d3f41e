//! task-graph-ingest
//!
//! Command-line front end that streams task records into a task-graph
//! SQLite store.

use anyhow::{Context, Result};
use clap::Parser;
use task_graph_ingest::cli::import::ImportArgs;
use task_graph_ingest::cli::{Cli, Command};
use task_graph_ingest::config::Config;
use task_graph_ingest::db::Database;
use task_graph_ingest::format::format_import_result;
use task_graph_ingest::logging::{self, LogTarget};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

async fn run_import(config: Config, args: ImportArgs) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.server.db_path.display()
        )
    })?;

    let policy = args.policy(&config.import);
    let limits = args.limits(&config.import);
    info!(
        file = %args.file.display(),
        dedupe = %policy.dedupe,
        orphans = %policy.orphan_handling,
        mode = %policy.apply_mode(),
        dry_run = policy.dry_run,
        chunk_size = limits.chunk_size,
        "Starting import"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling import");
            on_signal.cancel();
        }
    });

    let input = args.open_input()?;
    let format = args.format;
    let result = tokio::task::spawn_blocking(move || {
        db.import_stream(input, format, &policy, limits, &cancel)
    })
    .await??;

    println!("{}", format_import_result(&result, args.output, policy.dry_run)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => Config::load_or_default(),
    };
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    match cli.command {
        Command::Import(args) => run_import(config, args).await,
    }
}
