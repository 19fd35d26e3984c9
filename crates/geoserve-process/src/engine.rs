//! Job execution.
//!
//! ```text
//! execute(session, process, request)
//!   ├─ Job::new (Accepted) ─► JobTracker
//!   ├─ decode inputs, check output ─► Failed (settled)
//!   ├─ WorkerPool::submit ─► Running ─► body ─► Succeeded | Failed
//!   └─ wait? ─► Job::wait_terminal
//! ```
//!
//! Sync and async requests share this path. The only difference is whether
//! `execute` waits for the job before returning it. A request whose inputs
//! cannot be decoded fails before submission, whatever the mode.

use std::collections::HashMap;
use std::sync::Arc;

use geoserve_session::Session;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::body::Outputs;
use crate::descriptor::ProcessDescriptor;
use crate::error::{ProcessError, Result};
use crate::inputs::{self, DecodedInputs};
use crate::job::{Job, JobId, JobStatus};
use crate::journal::JobJournal;
use crate::registry::Process;
use crate::request::{ExecutionMode, ExecutionRequest, ResponseFormat};

/// Decides whether `mode=auto` requests wait for their job.
pub trait ExecutionPolicy: Send + Sync {
    fn wait_for(&self, descriptor: &ProcessDescriptor) -> bool;
}

/// Same answer for every process.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy {
    wait: bool,
}

impl FixedPolicy {
    pub fn synchronous() -> Self {
        Self { wait: true }
    }

    pub fn asynchronous() -> Self {
        Self { wait: false }
    }
}

impl Default for FixedPolicy {
    fn default() -> Self {
        Self::asynchronous()
    }
}

impl ExecutionPolicy for FixedPolicy {
    fn wait_for(&self, _descriptor: &ProcessDescriptor) -> bool {
        self.wait
    }
}

/// Server-wide index of jobs.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<JobId, Arc<Job>>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Arc<Job>) {
        self.jobs.write().insert(job.id(), job);
    }

    pub fn get(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

/// A started job and whether its outcome was known on return.
#[derive(Debug, Clone)]
pub struct Execution {
    pub job: Arc<Job>,
    /// True when the caller waited for the job, or the request was
    /// rejected before reaching the worker pool.
    pub settled: bool,
}

/// Runs processes for sessions.
#[derive(Clone)]
pub struct ExecutionEngine {
    policy: Arc<dyn ExecutionPolicy>,
    jobs: JobTracker,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(FixedPolicy::default())
    }
}

impl ExecutionEngine {
    pub fn new(policy: impl ExecutionPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
            jobs: JobTracker::new(),
        }
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Whether a request in `mode` for `descriptor` waits for its job.
    pub fn waits(&self, mode: ExecutionMode, descriptor: &ProcessDescriptor) -> bool {
        match mode {
            ExecutionMode::Sync => true,
            ExecutionMode::Async => false,
            ExecutionMode::Auto => self.policy.wait_for(descriptor),
        }
    }

    /// Start a job for `process` on the session's worker pool.
    ///
    /// Returns once the job is terminal when the request waits, otherwise
    /// right after submission.
    pub async fn execute(
        &self,
        session: Arc<Session>,
        process: Process,
        request: ExecutionRequest,
    ) -> Execution {
        let wait = self.waits(request.mode, process.descriptor());
        let job = Arc::new(Job::new(session.token(), request));
        self.jobs.insert(Arc::clone(&job));
        journal(&session, &job);

        info!(
            job_id = %job.id(),
            process = %job.process(),
            token = %session.token(),
            wait,
            "Job accepted"
        );

        let decoded = match prepare(process.descriptor(), job.request()) {
            Ok(decoded) => decoded,
            Err(e) => {
                job.fail(e.to_string());
                error!(job_id = %job.id(), process = %job.process(), error = %e, "Job rejected");
                journal(&session, &job);
                return Execution { job, settled: true };
            }
        };

        let handle = {
            let pool = session.pool().clone();
            let session = Arc::clone(&session);
            let job = Arc::clone(&job);
            pool.submit(move || run(&session, &process, &job, &decoded))
        };

        let supervised = Arc::clone(&job);
        tokio::spawn(async move {
            let failure = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure
                && supervised.fail(reason.clone())
            {
                error!(job_id = %supervised.id(), error = %reason, "Job could not run");
                journal(&session, &supervised);
            }
        });

        if wait {
            job.wait_terminal().await;
        }
        Execution { job, settled: wait }
    }
}

/// Checks that need no session: the requested output exists and the
/// input blob decodes against the ports.
fn prepare(descriptor: &ProcessDescriptor, request: &ExecutionRequest) -> Result<DecodedInputs> {
    if let Some(ref name) = request.output
        && descriptor.output(name).is_none()
    {
        return Err(ProcessError::UnknownOutput(name.clone()));
    }
    inputs::decode(descriptor, request.inputs.as_deref())
}

fn run(session: &Session, process: &Process, job: &Job, inputs: &DecodedInputs) {
    if !job.transition(JobStatus::Running) {
        return;
    }
    journal(session, job);
    debug!(job_id = %job.id(), "Job running");

    match invoke(session, process, job, inputs) {
        Ok(result) => {
            job.succeed(result);
            info!(job_id = %job.id(), "Job succeeded");
        }
        Err(e) => {
            job.fail(e.to_string());
            error!(job_id = %job.id(), process = %job.process(), error = %e, "Job failed");
        }
    }
    journal(session, job);
}

fn invoke(session: &Session, process: &Process, job: &Job, inputs: &DecodedInputs) -> Result<Value> {
    let descriptor = process.descriptor();
    let datasource = session.require_datasource()?;
    let outputs = datasource.with_connection(|conn| process.body().run(conn, descriptor, inputs))?;
    Ok(shape(outputs, descriptor, job.request()))
}

/// Apply the requested output and response format to raw outputs.
fn shape(mut outputs: Outputs, descriptor: &ProcessDescriptor, request: &ExecutionRequest) -> Value {
    match request.response_format {
        ResponseFormat::Raw => {
            let name = request
                .output
                .as_deref()
                .or_else(|| descriptor.outputs.first().map(|p| p.name.as_str()));
            name.and_then(|n| outputs.remove(n)).unwrap_or(Value::Null)
        }
        ResponseFormat::Document => match request.output {
            Some(ref name) => {
                let mut only = Map::new();
                only.insert(name.clone(), outputs.remove(name).unwrap_or(Value::Null));
                Value::Object(only)
            }
            None => Value::Object(outputs),
        },
    }
}

fn journal(session: &Session, job: &Job) {
    if let Some(journal) = session.service::<JobJournal>() {
        journal.record(job);
    }
}
