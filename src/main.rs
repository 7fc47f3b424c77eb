//! CLI entry point for bookcase.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use bookcase_config::Config;
use bookcase_library::ingest::{IngestRecord, Pipeline, PipelineOptions, RunState};
use bookcase_library::progress::{StageStatus, overall};
use bookcase_library::source::ByteSource;
use bookcase_store::{Database, LAST_INGEST_KEY, LibraryStore, SqliteStore};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Conventional exit status for a run interrupted by Ctrl-C.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse before installing the subscriber so --help works without logs.
    let args = Args::parse();

    // RUST_LOG wins over -q, which wins over -v.
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> CliResult<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = args.database {
        config.store.path = path;
    }
    if let Some(parent) = config.store.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db = Database::connect(&config.store.path).await?;
    let store = Arc::new(SqliteStore::new(db.clone()));

    let result = match args.command {
        Command::Ingest { archive, catalog, max_records } => {
            let mut options = PipelineOptions::from(&config.pipeline);
            if max_records.is_some() {
                options.max_records = max_records;
            }
            let catalog = match catalog {
                Some(path) => Some(tokio::fs::read_to_string(&path).await?),
                None => None,
            };
            let source = ByteSource::from_file(&archive).await?;
            ingest(store, options, catalog, source).await
        },
        Command::Search { query, limit } => {
            let found = store.search(&query, limit).await?;
            for record in &found {
                println!("{record}");
            }
            info!(matches = found.len(), limit, "search finished");
            Ok(ExitCode::SUCCESS)
        },
        Command::Count => {
            println!("{}", store.count().await?);
            if let Some(json) = store.get_metadata(LAST_INGEST_KEY).await? {
                match serde_json::from_str::<IngestRecord>(&json) {
                    Ok(last) => info!(
                        source = %last.source,
                        state = %last.state,
                        finished_at = %last.finished_at,
                        committed = last.summary.committed,
                        "last ingestion"
                    ),
                    Err(error) => warn!(%error, "could not read last ingestion record"),
                }
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Clear => {
            let before = store.count().await?;
            store.clear().await?;
            info!(removed = before, "library cleared");
            Ok(ExitCode::SUCCESS)
        },
    };
    db.close().await;
    result
}

async fn ingest(
    store: Arc<SqliteStore>,
    options: PipelineOptions,
    catalog: Option<String>,
    source: ByteSource,
) -> CliResult<ExitCode> {
    let mut pipeline = Pipeline::new(store).with_options(options);
    if let Some(text) = catalog {
        pipeline = pipeline.with_catalog_text(text);
    }
    pipeline.progress().subscribe(|event, snapshot| {
        let overall = format!("{:.1}%", overall(snapshot));
        match event.status {
            StageStatus::Completed => info!(stage = %event.stage, current = event.current, %overall, "stage completed"),
            StageStatus::Failed => warn!(stage = %event.stage, current = event.current, %overall, "stage failed"),
            _ => info!(stage = %event.stage, current = event.current, total = ?event.total, %overall, "progress"),
        }
    });

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping after the current entry");
                cancel.cancel();
            }
        }
    });
    let outcome = pipeline.run(source, cancel).await?;
    interrupt.abort();

    let summary = &outcome.summary;
    info!(
        state = %outcome.state,
        committed = summary.committed,
        duplicates = summary.duplicates,
        unmatched = summary.unmatched,
        elapsed_ms = summary.elapsed_ms,
        "ingestion finished"
    );
    Ok(match (outcome.state, outcome.error) {
        (RunState::Completed, _) => ExitCode::SUCCESS,
        (RunState::Cancelled, _) => ExitCode::from(INTERRUPTED),
        (_, Some(err)) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
        (_, None) => ExitCode::FAILURE,
    })
}
