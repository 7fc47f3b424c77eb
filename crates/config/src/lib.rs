//! Layered configuration for bookcase.
//!
//! Values are merged, later layers winning:
//! 1. built-in defaults,
//! 2. a TOML file (by default `bookcase.toml` in the platform config
//!    directory, see [`default_config_path`]),
//! 3. `BOOKCASE_` prefixed environment variables, nested with `__`
//!    (`BOOKCASE_PIPELINE__QUEUE_CAPACITY=32`).
//!
//! ```toml
//! [pipeline]
//! queue_capacity = 16
//! progress_every = 256
//! progress_interval_ms = 250
//! catalog_name = "GUTINDEX.ALL"
//! source = "gutenberg"
//!
//! [store]
//! path = "/var/lib/bookcase/library.db"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use bookcase_catalog::DEFAULT_CATALOG_NAME;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

pub const ENV_PREFIX: &str = "BOOKCASE_";
pub const CONFIG_FILE_NAME: &str = "bookcase.toml";
const DATABASE_FILE_NAME: &str = "library.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "bookcase")
}

/// `bookcase.toml` in the platform's config directory, if there is one.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Tuning for the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Archive entries buffered between extraction and ingestion.
    pub queue_capacity: usize,
    /// Emit progress at least every this many entries.
    pub progress_every: u64,
    /// ...and at least this often, whichever comes first.
    pub progress_interval_ms: u64,
    /// File name of the catalog member inside the archive.
    pub catalog_name: String,
    /// Source tag, used as the prefix of every record id.
    pub source: String,
    /// Stop after committing this many records.
    pub max_records: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            progress_every: 256,
            progress_interval_ms: 250,
            catalog_name: DEFAULT_CATALOG_NAME.to_string(),
            source: "gutenberg".to_string(),
            max_records: None,
        }
    }
}

impl PipelineConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_database_path() }
    }
}

impl Config {
    /// Build the layered provider without extracting it.
    ///
    /// `file` overrides the default config file location. Missing files are
    /// skipped here; [`Config::load`] rejects an explicit path that doesn't
    /// exist.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file.map(Path::to_path_buf).or_else(default_config_path) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    #[instrument(skip_all, fields(file = ?file))]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Self::from_figment(&Self::figment(file))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Check the values a provider can't enforce.
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.pipeline.queue_capacity == 0 {
            problems.push("pipeline.queue_capacity must be at least 1");
        }
        if self.pipeline.progress_every == 0 {
            problems.push("pipeline.progress_every must be at least 1");
        }
        if self.pipeline.progress_interval_ms == 0 {
            problems.push("pipeline.progress_interval_ms must be at least 1");
        }
        if self.pipeline.catalog_name.trim().is_empty() {
            problems.push("pipeline.catalog_name must not be empty");
        }
        if self.pipeline.source.trim().is_empty() {
            problems.push("pipeline.source must not be empty");
        }
        if self.pipeline.max_records == Some(0) {
            problems.push("pipeline.max_records must be at least 1 when set");
        }
        if self.store.path.as_os_str().is_empty() {
            problems.push("store.path must not be empty");
        }
        if !problems.is_empty() {
            exn::bail!(ErrorKind::Invalid(problems.join("; ")));
        }
        Ok(())
    }
}
