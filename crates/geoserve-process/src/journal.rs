//! Per-session journal of job transitions.

use std::any::Any;
use std::sync::Arc;

use geoserve_session::{DATA_SOURCE, Datasource, PropertyBag, Service, ServiceError, ServiceFactory};
use rusqlite::params;
use tracing::warn;

use crate::job::Job;

const SERVICE_NAME: &str = "job-journal";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS wps_jobs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    process TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_wps_jobs_job_id ON wps_jobs(job_id);
";

/// One journaled transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub job_id: String,
    pub process: String,
    pub status: String,
    pub message: Option<String>,
}

/// Records every job transition in the session database.
pub struct JobJournal {
    datasource: Datasource,
}

impl JobJournal {
    /// Attach to `datasource`, creating the journal table.
    pub fn open(datasource: Datasource) -> rusqlite::Result<Self> {
        datasource.with_connection(|conn| conn.execute_batch(SCHEMA))?;
        Ok(Self { datasource })
    }

    /// Append the job's current status. Failures are logged, never raised.
    pub fn record(&self, job: &Job) {
        let result = self.datasource.with_connection(|conn| {
            conn.execute(
                "INSERT INTO wps_jobs (job_id, process, status, message, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    job.id().to_string(),
                    job.process(),
                    job.status().to_string(),
                    job.error(),
                    job.updated_at().to_rfc3339(),
                ],
            )
        });
        if let Err(e) = result {
            warn!(job_id = %job.id(), error = %e, "Failed to journal job transition");
        }
    }

    /// Journaled transitions of one job, oldest first.
    pub fn entries(&self, job_id: &str) -> rusqlite::Result<Vec<JournalEntry>> {
        self.datasource.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT job_id, process, status, message FROM wps_jobs
                 WHERE job_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt.query_map([job_id], |row| {
                Ok(JournalEntry {
                    job_id: row.get(0)?,
                    process: row.get(1)?,
                    status: row.get(2)?,
                    message: row.get(3)?,
                })
            })?;
            rows.collect()
        })
    }
}

impl Service for JobJournal {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds a [`JobJournal`] from the session datasource.
#[derive(Debug, Default)]
pub struct JobJournalFactory;

impl ServiceFactory for JobJournalFactory {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn create(&self, properties: &PropertyBag) -> Result<Arc<dyn Service>, ServiceError> {
        let datasource = properties.require::<Datasource>(DATA_SOURCE, SERVICE_NAME)?;
        let journal = JobJournal::open(datasource.clone()).map_err(|e| ServiceError::Failed {
            service: SERVICE_NAME.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(journal))
    }
}
