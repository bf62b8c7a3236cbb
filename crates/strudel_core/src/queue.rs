//! Delayed find/replace changes against the pattern store.
//!
//! Each queued change owns a timer task on the tokio runtime. When the timer
//! fires the change is marked running, the store is read, and the first
//! verbatim occurrence of `find` is replaced. If `find` is not in the file
//! the change is described in plain words and handed to a [`FallbackAgent`].
//! Either way the entry leaves the live list once the chosen path resolves.
//!
//! Literal substitutions hold a queue-wide lock across their read and write,
//! so two changes due at the same moment never interleave. Agent calls run
//! outside that lock.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::error::{Error, ErrorKind};
use crate::store::PatternStore;

/// Reports kept for [`ChangeQueue::history`].
pub const HISTORY_LIMIT: usize = 50;

const EVENT_CAPACITY: usize = 64;

/// Something that can carry out a change described in natural language.
///
/// Implementations may take any amount of time and may edit the pattern
/// file by their own means. The returned text is free-form.
pub trait FallbackAgent: Send + Sync {
    fn apply(&self, instruction: String) -> BoxFuture<'_, anyhow::Result<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub find: String,
    pub replace: String,
    /// Seconds to wait before firing; 0 fires right away.
    #[serde(default)]
    pub delay_seconds: u64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Pending,
    Running,
}

/// A change in the live list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedChange {
    pub id: u64,
    pub find: String,
    pub replace: String,
    pub description: Option<String>,
    pub delay_seconds: u64,
    pub scheduled_at: DateTime<Local>,
    pub execute_at: DateTime<Local>,
    pub status: ChangeStatus,
}

/// Receipt for an accepted change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scheduled {
    pub id: u64,
    pub due_at: DateTime<Local>,
    pub status: ChangeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMethod {
    FindReplace,
    AgentFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Cancelled,
    Error,
}

/// What happened to a change once it left the live list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub id: u64,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExecutionMethod>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub finished_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelOutcome {
    Cancelled,
    /// The change already started; cancelling is a no-op.
    InFlight,
    NotFound,
}

struct Entry {
    change: QueuedChange,
    timer: Option<AbortHandle>,
}

struct Inner {
    store: PatternStore,
    agent: Arc<dyn FallbackAgent>,
    entries: Mutex<BTreeMap<u64, Entry>>,
    next_id: AtomicU64,
    write_lock: tokio::sync::Mutex<()>,
    history: Mutex<VecDeque<ExecutionReport>>,
    events: broadcast::Sender<ExecutionReport>,
}

/// Shared handle to the change queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct ChangeQueue {
    inner: Arc<Inner>,
}

impl ChangeQueue {
    pub fn new(store: PatternStore, agent: Arc<dyn FallbackAgent>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                agent,
                entries: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                write_lock: tokio::sync::Mutex::new(()),
                history: Mutex::new(VecDeque::new()),
                events,
            }),
        }
    }

    pub fn store(&self) -> &PatternStore {
        &self.inner.store
    }

    /// Accept a change and start its timer. Must be called from within a
    /// tokio runtime.
    pub fn enqueue(&self, request: ChangeRequest) -> Result<Scheduled, Error> {
        let delay = request.delay_seconds;
        let scheduled_at = Local::now();
        let execute_at = i64::try_from(delay)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| scheduled_at.checked_add_signed(delta))
            .ok_or(Error::InvalidDelay(delay))?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let change = QueuedChange {
            id,
            find: request.find,
            replace: request.replace,
            description: request.description,
            delay_seconds: delay,
            scheduled_at,
            execute_at,
            status: ChangeStatus::Pending,
        };

        // Spawn while holding the lock so the task cannot look the entry up
        // before it exists.
        let mut entries = self.inner.entries.lock();
        let queue = self.clone();
        let task = tokio::spawn(async move {
            if delay > 0 {
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
            queue.run(id).await;
        });
        entries.insert(
            id,
            Entry {
                change,
                timer: Some(task.abort_handle()),
            },
        );
        drop(entries);

        info!("Scheduled change {} to run at {}", id, execute_at);
        Ok(Scheduled {
            id,
            due_at: execute_at,
            status: ChangeStatus::Pending,
        })
    }

    /// Run a pending change now instead of waiting for its timer.
    ///
    /// Returns `None` when the id is unknown or the change already started.
    /// The run happens on its own task, so dropping the returned future
    /// does not leave the entry stuck in the running state.
    pub async fn execute(&self, id: u64) -> Option<ExecutionReport> {
        let timer = self
            .inner
            .entries
            .lock()
            .get_mut(&id)
            .filter(|entry| entry.change.status == ChangeStatus::Pending)
            .and_then(|entry| entry.timer.take());
        if let Some(timer) = timer {
            timer.abort();
        }

        let queue = self.clone();
        match tokio::spawn(async move { queue.run(id).await }).await {
            Ok(report) => report,
            Err(err) => {
                warn!("Change {} did not finish: {}", id, err);
                None
            }
        }
    }

    async fn run(&self, id: u64) -> Option<ExecutionReport> {
        let change = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.get_mut(&id)?;
            if entry.change.status != ChangeStatus::Pending {
                return None;
            }
            entry.change.status = ChangeStatus::Running;
            entry.timer = None;
            entry.change.clone()
        };
        info!("Executing change {}", id);

        let (outcome, method, message, error_kind) = match self.substitute(&change).await {
            Ok(true) => (
                Outcome::Done,
                ExecutionMethod::FindReplace,
                format!(
                    "Successfully replaced '{}' with '{}'",
                    truncate(&change.find, 50),
                    truncate(&change.replace, 50)
                ),
                None,
            ),
            Ok(false) => {
                warn!("Change {}: text not found, handing it to the agent", id);
                match self.inner.agent.apply(fallback_instruction(&change)).await {
                    Ok(response) => (
                        Outcome::Done,
                        ExecutionMethod::AgentFallback,
                        format!("Agent handled the change: {}", truncate(&response, 200)),
                        None,
                    ),
                    Err(err) => {
                        let err = Error::FallbackFailure(format!("{:#}", err));
                        warn!("Change {}: {}", id, err);
                        (
                            Outcome::Error,
                            ExecutionMethod::AgentFallback,
                            err.to_string(),
                            Some(err.kind()),
                        )
                    }
                }
            }
            Err(err) => {
                warn!("Change {} failed: {}", id, err);
                (
                    Outcome::Error,
                    ExecutionMethod::FindReplace,
                    err.to_string(),
                    Some(err.kind()),
                )
            }
        };

        self.inner.entries.lock().remove(&id);

        let report = ExecutionReport {
            id,
            outcome,
            method: Some(method),
            message,
            error_kind,
            finished_at: Local::now(),
        };
        info!("Change {} finished: {}", id, report.message);
        self.record(report.clone());
        Some(report)
    }

    /// Replace the first occurrence of `find` under the write lock.
    /// `Ok(false)` means the text was not there.
    async fn substitute(&self, change: &QueuedChange) -> Result<bool, Error> {
        if change.find.is_empty() {
            return Ok(false);
        }

        let _guard = self.inner.write_lock.lock().await;
        let current = self.inner.store.read().await?;
        match replace_first(&current, &change.find, &change.replace) {
            Some(updated) => {
                self.inner.store.write(&updated).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn cancel(&self, id: u64) -> CancelOutcome {
        let mut entries = self.inner.entries.lock();
        let status = match entries.get(&id) {
            Some(entry) => entry.change.status,
            None => return CancelOutcome::NotFound,
        };
        if status == ChangeStatus::Running {
            return CancelOutcome::InFlight;
        }

        if let Some(timer) = entries.remove(&id).and_then(|entry| entry.timer) {
            timer.abort();
        }
        drop(entries);

        info!("Cancelled change {}", id);
        self.record(ExecutionReport {
            id,
            outcome: Outcome::Cancelled,
            method: None,
            message: "Change cancelled before it ran".to_string(),
            error_kind: None,
            finished_at: Local::now(),
        });
        CancelOutcome::Cancelled
    }

    /// Live changes ordered by id.
    pub fn list(&self) -> Vec<QueuedChange> {
        self.inner
            .entries
            .lock()
            .values()
            .map(|entry| entry.change.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent reports, oldest first.
    pub fn history(&self) -> Vec<ExecutionReport> {
        self.inner.history.lock().iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionReport> {
        self.inner.events.subscribe()
    }

    fn record(&self, report: ExecutionReport) {
        {
            let mut history = self.inner.history.lock();
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(report.clone());
        }
        // Ignore send errors (no subscribers is fine)
        let _ = self.inner.events.send(report);
    }
}

/// `text` with the first occurrence of `find` replaced, or `None` if absent.
pub fn replace_first(text: &str, find: &str, replace: &str) -> Option<String> {
    if find.is_empty() {
        return None;
    }
    let at = text.find(find)?;
    let mut out = String::with_capacity(text.len() + replace.len());
    out.push_str(&text[..at]);
    out.push_str(replace);
    out.push_str(&text[at + find.len()..]);
    Some(out)
}

/// The instruction sent to the agent when the literal text is missing.
pub fn fallback_instruction(change: &QueuedChange) -> String {
    let wanted = match change.description.as_deref().map(str::trim) {
        Some(desc) if !desc.is_empty() => desc.to_string(),
        _ => format!("Replace {} with {}", change.find, change.replace),
    };
    format!(
        "The scheduled find/replace failed because the text wasn't found. Please make this change: {}",
        wanted
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(description: Option<&str>) -> QueuedChange {
        let now = Local::now();
        QueuedChange {
            id: 7,
            find: "bpm: 30".into(),
            replace: "bpm: 60".into(),
            description: description.map(str::to_string),
            delay_seconds: 0,
            scheduled_at: now,
            execute_at: now,
            status: ChangeStatus::Pending,
        }
    }

    #[test]
    fn test_replace_first_only() {
        assert_eq!(
            replace_first("a x b x", "x", "y").as_deref(),
            Some("a y b x")
        );
        assert_eq!(replace_first("abc", "zz", "y"), None);
        assert_eq!(replace_first("abc", "", "y"), None);
    }

    #[test]
    fn test_fallback_instruction_prefers_description() {
        let text = fallback_instruction(&change(Some("Speed things up")));
        assert!(text.ends_with("Please make this change: Speed things up"));

        let text = fallback_instruction(&change(None));
        assert!(text.ends_with("Please make this change: Replace bpm: 30 with bpm: 60"));

        let text = fallback_instruction(&change(Some("  ")));
        assert!(text.ends_with("Replace bpm: 30 with bpm: 60"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_request_defaults() {
        let req: ChangeRequest =
            serde_json::from_str(r#"{"find": "a", "replace": "b"}"#).unwrap();
        assert_eq!(req.delay_seconds, 0);
        assert_eq!(req.description, None);
    }

    #[test]
    fn test_cancel_outcome_wire_names() {
        assert_eq!(
            serde_json::to_value(CancelOutcome::InFlight).unwrap(),
            "in-flight"
        );
    }
}
