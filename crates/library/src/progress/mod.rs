//! Unified progress across the pipeline's stages.
//!
//! The [`ProgressCoordinator`] is the only writer of stage state. Stages
//! report through [`update_stage`](ProgressCoordinator::update_stage), which
//! is serialized internally and can be called from the extraction worker and
//! the ingestion task alike. Every accepted update is pushed, synchronously
//! and in subscription order, to every subscriber along with a snapshot of
//! all stages.

mod throttle;

pub use self::throttle::Throttle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Mutex, MutexGuard};

/// A tracked phase of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Compressed bytes consumed from the source.
    Extract,
    /// Catalog records parsed.
    Parse,
    /// Content entries processed against the catalog.
    Ingest,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Extract, Stage::Parse, Stage::Ingest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Parse => "parse",
            Self::Ingest => "ingest",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Where one stage is at. `total` is `None` until it is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub current: u64,
    pub total: Option<u64>,
    pub status: StageStatus,
}

impl ProgressState {
    /// This stage's contribution to the overall progress, in `[0, 1]`.
    ///
    /// Pending and failed stages contribute nothing, and neither does an
    /// in-progress stage with an unknown (or zero) total.
    pub fn fraction(&self) -> f64 {
        match (self.status, self.total) {
            (StageStatus::Completed, _) => 1.0,
            (StageStatus::InProgress, Some(total)) if total > 0 => (self.current as f64 / total as f64).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// One accepted stage update, as delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current: u64,
    pub total: Option<u64>,
    pub status: StageStatus,
}

/// State of every known stage.
pub type ProgressSnapshot = BTreeMap<Stage, ProgressState>;

type Subscriber = Box<dyn Fn(&ProgressEvent, &ProgressSnapshot) + Send + Sync>;

#[derive(Default)]
struct Inner {
    stages: ProgressSnapshot,
    subscribers: Vec<Subscriber>,
    sealed: bool,
}

/// Aggregates stage progress into one overall percentage and an event feed.
///
/// # Examples
///
/// ```
/// use bookcase_library::progress::{ProgressCoordinator, Stage, StageStatus};
/// use std::sync::{Arc, Mutex};
///
/// let progress = ProgressCoordinator::with_stages(Stage::ALL);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// progress.subscribe(move |event, _snapshot| sink.lock().unwrap().push(event.stage));
///
/// progress.update_stage(Stage::Parse, 10, Some(10), StageStatus::Completed);
/// progress.update_stage(Stage::Extract, 50, Some(100), StageStatus::InProgress);
/// // (1.0 + 0.5 + 0.0) / 3
/// assert_eq!(progress.overall_progress(), 50.0);
/// assert_eq!(*seen.lock().unwrap(), [Stage::Parse, Stage::Extract]);
/// ```
#[derive(Default)]
pub struct ProgressCoordinator {
    inner: Mutex<Inner>,
}

impl ProgressCoordinator {
    /// A coordinator that knows no stages yet. Stages become known on their
    /// first update.
    pub fn new() -> Self {
        Self::default()
    }

    /// A coordinator with `stages` registered as pending, so they count
    /// towards the overall progress before they start.
    pub fn with_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        let coordinator = Self::default();
        {
            let mut inner = coordinator.lock();
            for stage in stages {
                inner.stages.insert(stage, ProgressState::default());
            }
        }
        coordinator
    }

    // A panicking subscriber must not take progress reporting down with it.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a callback for every future update.
    ///
    /// Callbacks run synchronously on the updating thread while updates are
    /// serialized, so they must be quick and must not call back into the
    /// coordinator.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent, &ProgressSnapshot) + Send + Sync + 'static,
    {
        self.lock().subscribers.push(Box::new(callback));
    }

    /// Overwrite the state of `stage` and notify subscribers.
    ///
    /// The state is normalized first: `current` never exceeds a known
    /// `total`, and never goes backwards while the stage stays in progress.
    /// Returns `false` if the update was dropped because the coordinator has
    /// been [sealed](Self::seal).
    pub fn update_stage(&self, stage: Stage, current: u64, total: Option<u64>, status: StageStatus) -> bool {
        let mut inner = self.lock();
        if inner.sealed {
            tracing::trace!(%stage, current, "dropping progress update after seal");
            return false;
        }
        let mut current = current;
        if let Some(previous) = inner.stages.get(&stage)
            && previous.status == StageStatus::InProgress
            && status == StageStatus::InProgress
        {
            current = current.max(previous.current);
        }
        if let Some(total) = total {
            current = current.min(total);
        }
        let state = ProgressState { current, total, status };
        inner.stages.insert(stage, state);
        let event = ProgressEvent { stage, current, total, status };
        for subscriber in &inner.subscribers {
            subscriber(&event, &inner.stages);
        }
        true
    }

    /// Mean of every known stage's [fraction](ProgressState::fraction), as a
    /// percentage in `[0, 100]`. Zero when no stage is known.
    pub fn overall_progress(&self) -> f64 {
        overall(&self.lock().stages)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().stages.clone()
    }

    pub fn stage(&self, stage: Stage) -> Option<ProgressState> {
        self.lock().stages.get(&stage).copied()
    }

    /// Stop emitting. Every later update is dropped, so once this returns no
    /// subscriber hears anything again.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    #[cfg(test)]
    pub(crate) fn is_sealed(&self) -> bool {
        self.lock().sealed
    }
}

/// Overall percentage of a snapshot; see
/// [`ProgressCoordinator::overall_progress`].
pub fn overall(stages: &ProgressSnapshot) -> f64 {
    if stages.is_empty() {
        return 0.0;
    }
    let sum: f64 = stages.values().map(ProgressState::fraction).sum();
    (sum / stages.len() as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    #[case(StageStatus::Pending, 5, Some(10), 0.0)]
    #[case(StageStatus::InProgress, 5, Some(10), 0.5)]
    #[case(StageStatus::InProgress, 5, None, 0.0)]
    #[case(StageStatus::InProgress, 0, Some(0), 0.0)]
    #[case(StageStatus::Completed, 0, None, 1.0)]
    #[case(StageStatus::Failed, 9, Some(10), 0.0)]
    fn test_fraction(#[case] status: StageStatus, #[case] current: u64, #[case] total: Option<u64>, #[case] expected: f64) {
        assert_eq!(ProgressState { current, total, status }.fraction(), expected);
    }

    #[test]
    fn test_overall_is_mean_of_known_stages() {
        let progress = ProgressCoordinator::new();
        assert_eq!(progress.overall_progress(), 0.0);
        progress.update_stage(Stage::Extract, 25, Some(100), StageStatus::InProgress);
        assert_eq!(progress.overall_progress(), 25.0);
        progress.update_stage(Stage::Parse, 3, Some(3), StageStatus::Completed);
        assert_eq!(progress.overall_progress(), 62.5);
        progress.update_stage(Stage::Ingest, 1, None, StageStatus::Failed);
        assert_eq!(progress.overall_progress(), (0.25 + 1.0 + 0.0) / 3.0 * 100.0);
    }

    #[test]
    fn test_registered_stages_start_pending() {
        let progress = ProgressCoordinator::with_stages(Stage::ALL);
        assert_eq!(progress.snapshot().len(), 3);
        assert_eq!(progress.stage(Stage::Ingest), Some(ProgressState::default()));
        progress.update_stage(Stage::Extract, 1, Some(1), StageStatus::Completed);
        assert!((progress.overall_progress() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_is_clamped_to_total() {
        let progress = ProgressCoordinator::new();
        progress.update_stage(Stage::Extract, 150, Some(100), StageStatus::InProgress);
        assert_eq!(progress.stage(Stage::Extract).unwrap().current, 100);
        assert_eq!(progress.overall_progress(), 100.0);
    }

    #[test]
    fn test_regressions_are_clamped_while_in_progress() {
        let progress = ProgressCoordinator::new();
        progress.update_stage(Stage::Ingest, 10, None, StageStatus::InProgress);
        progress.update_stage(Stage::Ingest, 4, None, StageStatus::InProgress);
        assert_eq!(progress.stage(Stage::Ingest).unwrap().current, 10);
        // A new status is a fresh start.
        progress.update_stage(Stage::Ingest, 4, Some(4), StageStatus::Completed);
        assert_eq!(progress.stage(Stage::Ingest).unwrap().current, 4);
    }

    #[test]
    fn test_subscribers_are_called_in_order_with_snapshot() {
        let progress = ProgressCoordinator::with_stages(Stage::ALL);
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            progress.subscribe(move |event, snapshot| {
                log.lock().unwrap().push(format!("{name}:{}:{}:{}", event.stage, event.current, snapshot.len()));
            });
        }
        progress.update_stage(Stage::Extract, 7, Some(10), StageStatus::InProgress);
        progress.update_stage(Stage::Parse, 2, Some(2), StageStatus::Completed);
        assert_eq!(
            *log.lock().unwrap(),
            ["first:extract:7:3", "second:extract:7:3", "first:parse:2:3", "second:parse:2:3"]
        );
    }

    #[test]
    fn test_nothing_after_seal() {
        let progress = ProgressCoordinator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        progress.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(progress.update_stage(Stage::Extract, 1, None, StageStatus::InProgress));
        progress.seal();
        assert!(progress.is_sealed());
        assert!(!progress.update_stage(Stage::Extract, 2, None, StageStatus::InProgress));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(progress.stage(Stage::Extract).unwrap().current, 1);
    }

    #[test]
    fn test_concurrent_updates_stay_in_bounds() {
        let progress = Arc::new(ProgressCoordinator::with_stages(Stage::ALL));
        let violations = Arc::new(AtomicUsize::new(0));
        let seen = violations.clone();
        progress.subscribe(move |_, snapshot| {
            let out_of_bounds = snapshot.values().any(|state| state.total.is_some_and(|total| state.current > total));
            let percent = overall(snapshot);
            if out_of_bounds || !(0.0..=100.0).contains(&percent) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        let handles: Vec<_> = [Stage::Extract, Stage::Ingest]
            .into_iter()
            .map(|stage| {
                let progress = progress.clone();
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        progress.update_stage(stage, i * 3, Some(1_000), StageStatus::InProgress);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(progress.stage(Stage::Extract).unwrap().current, 1_000);
    }
}
