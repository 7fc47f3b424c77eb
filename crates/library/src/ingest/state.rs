use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Lifecycle of one [`Pipeline`](super::Pipeline) run.
///
/// ```text
/// Idle ──▶ Extracting ──▶ Ingesting ──▶ Completed
///              │              │
///              └──────┬───────┘
///                     ▼
///             Failed | Cancelled
/// ```
///
/// `Extracting` lasts while archive entries are still arriving (and being
/// ingested as they arrive); `Ingesting` covers the work left once the
/// archive is exhausted. Terminal states admit no further transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Extracting,
    Ingesting,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Extracting)
                | (Extracting, Ingesting)
                | (Ingesting, Completed)
                | (Extracting | Ingesting, Failed | Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Ingesting => "ingesting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
