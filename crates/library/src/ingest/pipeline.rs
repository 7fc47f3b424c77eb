use super::error::{Error, ErrorKind, Result};
use super::state::RunState;
use super::summary::{IngestRecord, IngestSummary};
use crate::extract::{ArchiveEntry, DEFAULT_QUEUE_CAPACITY, Extraction, extract};
use crate::progress::{ProgressCoordinator, Stage, StageStatus, Throttle};
use crate::source::ByteSource;
use bookcase_catalog::{Catalog, DEFAULT_CATALOG_NAME, etext_number_from_path, is_catalog_path};
use bookcase_config::PipelineConfig;
use bookcase_store::{BookRecord, LAST_INGEST_KEY, StoreHandle};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Knobs for a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub queue_capacity: usize,
    pub progress_every: u64,
    pub progress_interval: Duration,
    pub catalog_name: String,
    pub source: String,
    pub max_records: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress_every: 256,
            progress_interval: Duration::from_millis(250),
            catalog_name: DEFAULT_CATALOG_NAME.to_string(),
            source: "gutenberg".to_string(),
            max_records: None,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            progress_every: config.progress_every,
            progress_interval: config.progress_interval(),
            catalog_name: config.catalog_name.clone(),
            source: config.source.clone(),
            max_records: config.max_records,
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub struct RunOutcome {
    /// Always terminal.
    pub state: RunState,
    pub summary: IngestSummary,
    /// The fatal error, when `state` is [`RunState::Failed`].
    pub error: Option<Error>,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Streams an archive into a library store.
///
/// Entries are matched against the catalog by etext number as they arrive.
/// Content that arrives before the catalog is remembered (by number only)
/// and ingested once the catalog shows up. Each pipeline runs once.
///
/// # Examples
///
/// ```no_run
/// use bookcase_library::ingest::Pipeline;
/// use bookcase_library::source::ByteSource;
/// use bookcase_store::{Database, SqliteStore};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect("library.db").await?;
/// let mut pipeline = Pipeline::new(Arc::new(SqliteStore::new(db)));
/// pipeline.progress().subscribe(|event, _| println!("{} {}", event.stage, event.current));
///
/// let source = ByteSource::from_file("gutenberg.tar.gz").await?;
/// let outcome = pipeline.run(source, CancellationToken::new()).await?;
/// println!("{}: {} records", outcome.state, outcome.summary.committed);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    store: StoreHandle,
    progress: Arc<ProgressCoordinator>,
    options: PipelineOptions,
    catalog_text: Option<String>,
    state: RunState,
}

impl Pipeline {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            progress: Arc::new(ProgressCoordinator::with_stages(Stage::ALL)),
            options: PipelineOptions::default(),
            catalog_text: None,
            state: RunState::Idle,
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Report into an existing coordinator instead of a fresh one.
    pub fn with_progress(mut self, progress: Arc<ProgressCoordinator>) -> Self {
        self.progress = progress;
        self
    }

    /// Use this catalog instead of waiting for one inside the archive. A
    /// catalog member found in the archive is then ignored.
    pub fn with_catalog_text(mut self, text: impl Into<String>) -> Self {
        self.catalog_text = Some(text.into());
        self
    }

    pub fn progress(&self) -> &Arc<ProgressCoordinator> {
        &self.progress
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {next}", self.state);
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Fails only if the pipeline has already run; everything that can go
    /// wrong during the run is reported in the [`RunOutcome`].
    #[instrument(skip_all, fields(source = %self.options.source, total = source.total()))]
    pub async fn run(&mut self, source: ByteSource, cancel: CancellationToken) -> Result<RunOutcome> {
        if self.state != RunState::Idle {
            exn::bail!(ErrorKind::AlreadyRun);
        }
        let started = Instant::now();
        self.transition(RunState::Extracting);

        let mut run = Run {
            store: self.store.clone(),
            progress: self.progress.clone(),
            options: self.options.clone(),
            catalog: None,
            pending: Vec::new(),
            summary: IngestSummary::default(),
            throttle: Throttle::new(self.options.progress_every, self.options.progress_interval),
            total: source.total(),
            cancel: cancel.clone(),
        };
        let catalog_text = self.catalog_text.take();
        let mut extraction = extract(source, cancel.clone(), self.options.queue_capacity);
        let extracted = run.extract_all(&mut extraction, catalog_text).await;
        // Stops the worker if we finished early, even mid-read.
        drop(extraction);
        let result = extracted.and_then(|()| {
            self.transition(RunState::Ingesting);
            run.finish()
        });
        run.summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (state, error) = match result {
            Ok(()) => (RunState::Completed, None),
            Err(err) if *err == ErrorKind::Cancelled => {
                self.progress.seal();
                (RunState::Cancelled, None)
            },
            Err(err) => {
                run.report_failure(&err);
                (RunState::Failed, Some(err))
            },
        };
        self.transition(state);
        let summary = run.summary;
        match &error {
            None => tracing::info!(%state, ?summary, "ingestion finished"),
            Some(err) => tracing::error!(%state, kind = %**err, ?summary, "ingestion failed"),
        }
        if state != RunState::Failed {
            self.record(state, &summary).await;
        }
        Ok(RunOutcome { state, summary, error })
    }

    /// Remember the run in the store's metadata.
    async fn record(&self, state: RunState, summary: &IngestSummary) {
        let record = IngestRecord {
            source: self.options.source.clone(),
            state,
            finished_at: UtcDateTime::now().format(&Rfc3339).unwrap_or_default(),
            summary: summary.clone(),
        };
        let written = match serde_json::to_string(&record) {
            Ok(json) => self.store.set_metadata(LAST_INGEST_KEY, &json).await.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        if let Err(error) = written {
            tracing::warn!(%error, "could not record ingestion summary");
        }
    }
}

/// Everything that lives only for the duration of one run.
struct Run {
    store: StoreHandle,
    progress: Arc<ProgressCoordinator>,
    options: PipelineOptions,
    catalog: Option<Catalog>,
    /// Etext numbers of content seen before the catalog, in arrival order.
    pending: Vec<u64>,
    summary: IngestSummary,
    throttle: Throttle,
    total: Option<u64>,
    cancel: CancellationToken,
}

/// Whether to keep pulling entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    LimitReached,
}

impl Run {
    async fn extract_all(&mut self, extraction: &mut Extraction, catalog_text: Option<String>) -> Result<()> {
        self.progress.update_stage(Stage::Extract, 0, self.total, StageStatus::InProgress);
        self.progress.update_stage(Stage::Ingest, 0, None, StageStatus::InProgress);
        if let Some(text) = catalog_text {
            tracing::debug!(size = text.len(), "using supplied catalog");
            self.accept_catalog(Catalog::from_text(&text));
        }
        // Time-based reports while no entry arrives (a stalled source, a huge
        // member); the throttle covers the busy case.
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.options.progress_interval,
            self.options.progress_interval.max(Duration::from_millis(1)),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
                next = extraction.next() => next,
                _ = ticker.tick() => {
                    self.summary.bytes_consumed = self.summary.bytes_consumed.max(extraction.bytes_consumed());
                    self.report();
                    self.throttle.reset();
                    continue;
                },
            };
            let Some(entry) = next else {
                break;
            };
            let entry = entry.map_err(ErrorKind::extract)?;
            self.summary.entries += 1;
            self.summary.bytes_consumed = self.summary.bytes_consumed.max(entry.bytes_consumed);
            if self.handle(entry).await? == Flow::LimitReached {
                tracing::info!(committed = self.summary.committed, "record limit reached");
                break;
            }
            if cancel.is_cancelled() {
                exn::bail!(ErrorKind::Cancelled);
            }
            if self.throttle.tick() {
                self.report();
                ticker.reset();
            }
        }
        self.summary.bytes_consumed = self.summary.bytes_consumed.max(extraction.bytes_consumed());
        let consumed = self.summary.bytes_consumed;
        let total = self.total.map_or(consumed, |total| total.max(consumed));
        self.progress.update_stage(Stage::Extract, consumed, Some(total), StageStatus::Completed);
        Ok(())
    }

    async fn handle(&mut self, entry: ArchiveEntry) -> Result<Flow> {
        if is_catalog_path(&entry.path, &self.options.catalog_name) {
            if self.catalog.is_some() {
                tracing::warn!(path = %entry.path.display(), "ignoring additional catalog");
                return Ok(Flow::Continue);
            }
            self.accept_catalog(Catalog::from_bytes(&entry.content));
            return self.flush_pending().await;
        }
        let Some(etext_number) = etext_number_from_path(&entry.path) else {
            tracing::trace!(path = %entry.path.display(), "ignoring non-content member");
            return Ok(Flow::Continue);
        };
        self.summary.content_entries += 1;
        if self.catalog.is_some() {
            self.commit(etext_number).await
        } else {
            self.pending.push(etext_number);
            Ok(Flow::Continue)
        }
    }

    fn accept_catalog(&mut self, catalog: Catalog) {
        let records = catalog.len() as u64;
        tracing::info!(records, shadowed = catalog.shadowed(), "catalog parsed");
        self.summary.catalog_records = records;
        self.catalog = Some(catalog);
        self.progress.update_stage(Stage::Parse, records, Some(records), StageStatus::Completed);
    }

    async fn flush_pending(&mut self) -> Result<Flow> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "ingesting content that arrived before the catalog");
        }
        let mut rest = pending.into_iter().peekable();
        while let Some(&etext_number) = rest.peek() {
            if self.cancel.is_cancelled() {
                self.pending = rest.collect();
                exn::bail!(ErrorKind::Cancelled);
            }
            rest.next();
            if self.commit(etext_number).await? == Flow::LimitReached {
                self.pending = rest.collect();
                return Ok(Flow::LimitReached);
            }
        }
        Ok(Flow::Continue)
    }

    /// Turn a catalogued content entry into a stored record.
    async fn commit(&mut self, etext_number: u64) -> Result<Flow> {
        let Some(record) = self.catalog.as_ref().and_then(|catalog| catalog.get(etext_number)) else {
            tracing::debug!(etext_number, "content not in catalog");
            self.summary.unmatched += 1;
            return Ok(Flow::Continue);
        };
        let book = BookRecord::new(&self.options.source, etext_number, &record.title, &record.author);
        match self.store.add(&book).await {
            Ok(()) => self.summary.committed += 1,
            Err(err) if err.is_duplicate() => {
                tracing::debug!(id = %book.id, "skipping duplicate record");
                self.summary.duplicates += 1;
            },
            Err(err) => return Err(ErrorKind::store(err)),
        }
        let limit_reached = self.options.max_records.is_some_and(|max| self.summary.committed >= max);
        Ok(if limit_reached { Flow::LimitReached } else { Flow::Continue })
    }

    fn report(&self) {
        self.progress.update_stage(Stage::Extract, self.summary.bytes_consumed, self.total, StageStatus::InProgress);
        self.progress.update_stage(Stage::Ingest, self.summary.resolved(), None, StageStatus::InProgress);
    }

    /// Everything has arrived; settle what's left.
    fn finish(&mut self) -> Result<()> {
        if self.catalog.is_none() {
            exn::bail!(ErrorKind::MissingCatalog);
        }
        // Only non-empty if the record limit cut a flush short.
        let skipped = self.pending.len();
        if skipped > 0 {
            tracing::info!(skipped, "record limit reached before all content was ingested");
        }
        let resolved = self.summary.resolved();
        self.progress.update_stage(Stage::Ingest, resolved, Some(resolved), StageStatus::Completed);
        Ok(())
    }

    /// Mark whichever stages were still running as failed.
    fn report_failure(&self, err: &Error) {
        tracing::debug!(kind = %**err, "marking unfinished stages failed");
        for stage in Stage::ALL {
            if let Some(state) = self.progress.stage(stage)
                && state.status == StageStatus::InProgress
            {
                self.progress.update_stage(stage, state.current, state.total, StageStatus::Failed);
            }
        }
    }
}
