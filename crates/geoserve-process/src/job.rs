//! Jobs: one execution of a process and its observable lifecycle.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use geoserve_session::SessionToken;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::request::ExecutionRequest;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle status.
///
/// `Accepted` moves to `Running` or `Failed`, and `Running` moves to a
/// terminal status. Nothing leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JobStatus {
    Accepted = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => JobStatus::Accepted,
            1 => JobStatus::Running,
            2 => JobStatus::Succeeded,
            _ => JobStatus::Failed,
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Accepted, JobStatus::Running | JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded | JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Accepted => "Accepted",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
        })
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Result(Value),
    Error(String),
}

/// One execution of a process.
///
/// Status lives in an atomic and changes through a forward-only
/// compare-and-swap, so it can be read from any thread without locking. The
/// outcome is written once, before the terminal status is published.
pub struct Job {
    id: JobId,
    process: String,
    session: SessionToken,
    request: ExecutionRequest,
    status: AtomicU8,
    outcome: OnceLock<JobOutcome>,
    created_at: DateTime<Utc>,
    updated_at: Mutex<DateTime<Utc>>,
    notify: watch::Sender<JobStatus>,
}

impl Job {
    /// A new job in `Accepted`.
    pub fn new(session: SessionToken, request: ExecutionRequest) -> Self {
        let now = Utc::now();
        let (notify, _) = watch::channel(JobStatus::Accepted);
        Self {
            id: JobId::new(),
            process: request.identifier.clone(),
            session,
            request,
            status: AtomicU8::new(JobStatus::Accepted as u8),
            outcome: OnceLock::new(),
            created_at: now,
            updated_at: Mutex::new(now),
            notify,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn request(&self) -> &ExecutionRequest {
        &self.request
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        *self.updated_at.lock()
    }

    /// The result, once succeeded.
    pub fn result(&self) -> Option<&Value> {
        match self.outcome.get()? {
            JobOutcome::Result(v) => Some(v),
            JobOutcome::Error(_) => None,
        }
    }

    /// The diagnostic, once failed.
    pub fn error(&self) -> Option<&str> {
        match self.outcome.get()? {
            JobOutcome::Error(e) => Some(e),
            JobOutcome::Result(_) => None,
        }
    }

    /// Move to `next` if that is a legal step. Returns whether it moved.
    pub fn transition(&self, next: JobStatus) -> bool {
        let moved = self
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                JobStatus::from_u8(current)
                    .can_transition_to(next)
                    .then_some(next as u8)
            })
            .is_ok();

        if moved {
            *self.updated_at.lock() = Utc::now();
            self.notify.send_replace(next);
        }
        moved
    }

    /// Record the result and move to `Succeeded`.
    pub fn succeed(&self, result: Value) -> bool {
        self.finish(JobOutcome::Result(result), JobStatus::Succeeded)
    }

    /// Record the diagnostic and move to `Failed`.
    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.finish(JobOutcome::Error(error.into()), JobStatus::Failed)
    }

    fn finish(&self, outcome: JobOutcome, status: JobStatus) -> bool {
        if !self.status().can_transition_to(status) || self.outcome.set(outcome).is_err() {
            return false;
        }
        self.transition(status)
    }

    /// Wait until the job reaches a terminal status.
    pub async fn wait_terminal(&self) -> JobStatus {
        let mut rx = self.notify.subscribe();
        match rx.wait_for(|s| s.is_terminal()).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("process", &self.process)
            .field("session", &self.session)
            .field("status", &self.status())
            .finish()
    }
}
