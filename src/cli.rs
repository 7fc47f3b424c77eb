use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ingest a compressed catalogued text archive into a searchable local library.
#[derive(Parser, Debug)]
#[command(name = "bookcase", version, about)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to bookcase.toml in the platform config directory)
    #[arg(short, long, env = "BOOKCASE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Library database, overriding the configured one
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream an archive into the library
    Ingest {
        /// Compressed tarball (gzip, bzip2, or plain tar)
        archive: PathBuf,

        /// Catalog file to use instead of the one inside the archive
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Stop after storing this many records
        #[arg(long)]
        max_records: Option<u64>,
    },
    /// Find records whose title or author contains QUERY (case-insensitive)
    Search {
        query: String,

        #[arg(short, long, default_value_t = bookcase_store::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Show how many records are stored, and how the last ingestion went
    Count,
    /// Remove every stored record
    Clear,
}
