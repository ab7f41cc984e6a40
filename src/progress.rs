//! Run status and progress reporting.
//!
//! Detection runs are background work. The surrounding job system owns the
//! run record; the engine talks to it through [`ProgressSink`]. Two sinks
//! ship with the crate: [`JobTracker`], which keeps the latest record per
//! run, and [`ChannelProgressSink`], which streams events to a poller over a
//! bounded channel.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Queued, not started.
    #[default]
    Pending,
    /// In progress.
    Running,
    /// Finished normally.
    Completed,
    /// Stopped by an error.
    Failed,
    /// Stopped on request.
    Aborted,
}

impl RunStatus {
    /// Returns true once the run can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Run-status sink owned by the surrounding job system.
pub trait ProgressSink: Send + Sync {
    /// Records progress (0 to 100) and a status message.
    fn report_progress(&self, run_id: RunId, percent: u8, message: &str);

    /// Marks the run failed with the underlying error text.
    fn mark_failed(&self, run_id: RunId, error: &str);

    /// Marks the run completed.
    fn mark_completed(&self, run_id: RunId, message: &str) {
        self.report_progress(run_id, 100, message);
    }

    /// Marks the run stopped on request.
    fn mark_aborted(&self, run_id: RunId, message: &str) {
        self.mark_failed(run_id, message);
    }

    /// External abort flag, checked between phases.
    fn is_aborted(&self, _run_id: RunId) -> bool {
        false
    }
}

/// Latest known state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// The run.
    pub run_id: RunId,
    /// Current state.
    pub status: RunStatus,
    /// Progress from 0 to 100.
    pub percent: u8,
    /// Last status message.
    pub message: String,
    /// Underlying error text of a failed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time of the last accepted update.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Pending,
            percent: 0,
            message: String::new(),
            error: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    jobs: HashMap<RunId, JobRecord>,
    abort_requested: HashSet<RunId>,
}

/// In-memory job table.
///
/// Terminal records are never overwritten by late progress updates.
#[derive(Debug, Default)]
pub struct JobTracker {
    state: RwLock<TrackerState>,
}

impl JobTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest record for a run, if any update was received.
    #[must_use]
    pub fn get(&self, run_id: RunId) -> Option<JobRecord> {
        self.state.read().ok()?.jobs.get(&run_id).cloned()
    }

    /// Asks a run to stop at its next phase boundary.
    pub fn request_abort(&self, run_id: RunId) {
        if let Ok(mut state) = self.state.write() {
            state.abort_requested.insert(run_id);
        }
    }

    fn update(&self, run_id: RunId, f: impl FnOnce(&mut JobRecord)) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let record = state.jobs.entry(run_id).or_insert_with(|| JobRecord::new(run_id));
        if record.status.is_terminal() {
            return;
        }
        f(record);
        record.updated_at = Utc::now();
    }
}

impl ProgressSink for JobTracker {
    fn report_progress(&self, run_id: RunId, percent: u8, message: &str) {
        self.update(run_id, |r| {
            r.status = RunStatus::Running;
            r.percent = percent.min(100);
            r.message = message.to_string();
        });
    }

    fn mark_failed(&self, run_id: RunId, error: &str) {
        self.update(run_id, |r| {
            r.status = RunStatus::Failed;
            r.message = "failed".to_string();
            r.error = Some(error.to_string());
        });
    }

    fn mark_completed(&self, run_id: RunId, message: &str) {
        self.update(run_id, |r| {
            r.status = RunStatus::Completed;
            r.percent = 100;
            r.message = message.to_string();
        });
    }

    fn mark_aborted(&self, run_id: RunId, message: &str) {
        self.update(run_id, |r| {
            r.status = RunStatus::Aborted;
            r.message = message.to_string();
        });
    }

    fn is_aborted(&self, run_id: RunId) -> bool {
        self.state
            .read()
            .map(|s| s.abort_requested.contains(&run_id))
            .unwrap_or(false)
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run.
    pub run_id: RunId,
    /// State after this event.
    pub status: RunStatus,
    /// Progress from 0 to 100; 0 on failure or abort.
    pub percent: u8,
    /// Status message, or the error text of a failure.
    pub message: String,
}

/// Streams progress events over a bounded channel.
///
/// Progress events are sent with `try_send` and dropped when the channel is
/// full. Terminal events wait briefly for room before being dropped.
#[derive(Debug)]
pub struct ChannelProgressSink {
    tx: Sender<ProgressEvent>,
    aborted: AtomicBool,
}

impl ChannelProgressSink {
    /// Creates a sink and its receiving stream.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, ProgressStream) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                aborted: AtomicBool::new(false),
            },
            ProgressStream { rx },
        )
    }

    /// Asks the run to stop at its next phase boundary.
    pub fn request_abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    fn send(&self, event: ProgressEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                if event.status.is_terminal() {
                    let _ = self.tx.send_timeout(event, Duration::from_millis(100));
                }
            }
        }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn report_progress(&self, run_id: RunId, percent: u8, message: &str) {
        self.send(ProgressEvent {
            run_id,
            status: RunStatus::Running,
            percent: percent.min(100),
            message: message.to_string(),
        });
    }

    fn mark_failed(&self, run_id: RunId, error: &str) {
        self.send(ProgressEvent {
            run_id,
            status: RunStatus::Failed,
            percent: 0,
            message: error.to_string(),
        });
    }

    fn mark_completed(&self, run_id: RunId, message: &str) {
        self.send(ProgressEvent {
            run_id,
            status: RunStatus::Completed,
            percent: 100,
            message: message.to_string(),
        });
    }

    fn mark_aborted(&self, run_id: RunId, message: &str) {
        self.send(ProgressEvent {
            run_id,
            status: RunStatus::Aborted,
            percent: 0,
            message: message.to_string(),
        });
    }

    fn is_aborted(&self, _run_id: RunId) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Receiving end of a [`ChannelProgressSink`].
#[derive(Debug)]
pub struct ProgressStream {
    rx: Receiver<ProgressEvent>,
}

impl ProgressStream {
    /// Next event, blocking. `None` once the sink is dropped and drained.
    #[must_use]
    pub fn recv(&self) -> Option<ProgressEvent> {
        self.rx.recv().ok()
    }

    /// Next event with a timeout.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains everything currently queued.
    #[must_use]
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_records_progress_then_completion() {
        let tracker = JobTracker::new();
        let run_id = RunId::new();
        assert!(tracker.get(run_id).is_none());

        tracker.report_progress(run_id, 30, "similarity");
        let r = tracker.get(run_id).unwrap();
        assert_eq!(r.status, RunStatus::Running);
        assert_eq!(r.percent, 30);

        tracker.mark_completed(run_id, "done");
        tracker.report_progress(run_id, 50, "late update");
        let r = tracker.get(run_id).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.percent, 100);
        assert_eq!(r.message, "done");
    }

    #[test]
    fn tracker_keeps_error_verbatim() {
        let tracker = JobTracker::new();
        let run_id = RunId::new();
        tracker.mark_failed(run_id, "Connection error: refused");
        let r = tracker.get(run_id).unwrap();
        assert_eq!(r.status, RunStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("Connection error: refused"));
    }

    #[test]
    fn tracker_abort_flag_is_per_run() {
        let tracker = JobTracker::new();
        let (a, b) = (RunId::new(), RunId::new());
        tracker.request_abort(a);
        assert!(tracker.is_aborted(a));
        assert!(!tracker.is_aborted(b));
    }

    #[test]
    fn channel_sink_streams_events() {
        let (sink, stream) = ChannelProgressSink::new(8);
        let run_id = RunId::new();
        sink.report_progress(run_id, 5, "loading claims");
        sink.mark_completed(run_id, "done");

        let events = stream.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].percent, 5);
        assert_eq!(events[1].status, RunStatus::Completed);
    }

    #[test]
    fn channel_sink_drops_progress_when_full() {
        let (sink, stream) = ChannelProgressSink::new(1);
        let run_id = RunId::new();
        sink.report_progress(run_id, 5, "a");
        sink.report_progress(run_id, 30, "b");
        let events = stream.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "a");
    }

    #[test]
    fn channel_sink_abort_flag() {
        let (sink, _stream) = ChannelProgressSink::new(1);
        assert!(!sink.is_aborted(RunId::new()));
        sink.request_abort();
        assert!(sink.is_aborted(RunId::new()));
    }

    #[test]
    fn stream_ends_when_sink_dropped() {
        let (sink, stream) = ChannelProgressSink::new(1);
        drop(sink);
        assert!(stream.recv().is_none());
        assert!(stream.recv_timeout(Duration::from_millis(1)).is_none());
    }
}
