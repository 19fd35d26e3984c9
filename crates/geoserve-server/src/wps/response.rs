//! WPS response documents.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use geoserve_process::{Job, JobStatus, ProcessDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wps::request::{WPS_VERSION, WpsOperation};

/// Short description of one process in the capabilities document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub identifier: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
}

impl From<&ProcessDescriptor> for ProcessSummary {
    fn from(d: &ProcessDescriptor) -> Self {
        Self {
            identifier: d.identifier.clone(),
            title: d.title.clone(),
            abstract_text: d.abstract_text.clone(),
            keywords: d.keywords.clone(),
        }
    }
}

/// GetCapabilities result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub service: String,
    pub version: String,
    pub title: String,
    pub operations: Vec<String>,
    pub contents: Vec<ProcessSummary>,
}

impl Capabilities {
    pub fn new(offerings: &[ProcessDescriptor]) -> Self {
        Self {
            service: "WPS".to_string(),
            version: WPS_VERSION.to_string(),
            title: "geoserve".to_string(),
            operations: WpsOperation::ALL.iter().map(|op| op.to_string()).collect(),
            contents: offerings.iter().map(ProcessSummary::from).collect(),
        }
    }
}

/// Full description of one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOffering {
    pub process: ProcessDescriptor,
    pub job_control_options: Vec<String>,
    pub output_transmission: Vec<String>,
}

/// DescribeProcess result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOfferings {
    pub process_offering: Vec<ProcessOffering>,
}

impl ProcessOfferings {
    pub fn new(descriptor: &ProcessDescriptor) -> Self {
        Self {
            process_offering: vec![ProcessOffering {
                process: descriptor.clone(),
                job_control_options: vec!["sync-execute".into(), "async-execute".into()],
                output_transmission: vec!["value".into()],
            }],
        }
    }
}

/// Job status document, returned by Execute and job polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub job_id: String,
    pub process: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusInfo {
    /// Snapshot of the job.
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id().to_string(),
            process: job.process().to_string(),
            status: job.status(),
            created_at: job.created_at(),
            updated_at: job.updated_at(),
            result: job.result().cloned(),
            message: job.error().map(str::to_string),
        }
    }
}

/// Any successful WPS response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WpsResponse {
    Capabilities(Capabilities),
    ProcessOfferings(ProcessOfferings),
    StatusInfo(StatusInfo),
}

impl IntoResponse for WpsResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
