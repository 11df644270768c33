use chrono::{DateTime, Local};
use serde::Serialize;

use crate::frame::LabelScore;
use crate::group::{Group, GroupTotals};

/// One row of the rolling group-score history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    /// Wall-clock time the cycle completed.
    pub timestamp: DateTime<Local>,
    /// Group totals of that cycle.
    pub totals: GroupTotals,
}

impl LogEntry {
    /// Timestamp rendered as `HH:MM:SS`.
    #[must_use]
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Everything an observer may read from the pipeline, copied out at the end of a tick.
///
/// # Example
/// ```
/// use sm_core::snapshot::MonitorSnapshot;
/// use sm_core::group::Group;
/// let snap = MonitorSnapshot::default();
/// assert_eq!(snap.status, Group::Silent);
/// assert!(!snap.alert);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    /// Current loudness [0, 100].
    pub loudness: u8,
    /// Current stabilized status.
    pub status: Group,
    /// Current alert flag.
    pub alert: bool,
    /// Top-N labels of the most recent completed classification.
    pub top_labels: Vec<LabelScore>,
    /// Rolling history, most recent last.
    pub event_log: Vec<LogEntry>,
    /// Completed classification cycles.
    pub cycles: u64,
    /// Cycles skipped on classifier failure or timeout.
    pub skipped: u64,
}

/// Notifications emitted by the pipeline as state changes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MonitorEvent {
    /// The stabilized status moved from one group to another.
    StatusChanged {
        /// Previous stabilized status.
        from: Group,
        /// New stabilized status.
        to: Group,
    },
    /// The crowd-noise alert was asserted.
    AlertRaised {
        /// Loudness on the asserting cycle.
        loudness: u8,
    },
    /// The alert was released.
    AlertCleared,
    /// A classification cycle failed and was skipped.
    CycleSkipped {
        /// Cycle identifier.
        cycle: u64,
        /// Human-readable failure.
        reason: String,
    },
}
