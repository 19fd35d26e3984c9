//! Geoprocessing processes and their execution.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ProcessRegistry                                             │
//! │  - CatalogResolver: built-ins + catalog directories          │
//! │  - ScriptResolver: file: URIs to manifests under roots       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ExecutionEngine                                             │
//! │  - decodes the input blob against the descriptor             │
//! │  - runs the body on the session worker pool                  │
//! │  - tracks Jobs (Accepted → Running → Succeeded | Failed)     │
//! │  - journals transitions through the session JobJournal       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod body;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod job;
pub mod journal;
pub mod manifest;
pub mod registry;
pub mod request;
pub mod template;

pub use body::{Outputs, ProcessBody, SqlScriptBody};
pub use descriptor::{DataType, Port, ProcessDescriptor};
pub use engine::{Execution, ExecutionEngine, ExecutionPolicy, FixedPolicy, JobTracker};
pub use error::{ProcessError, Result};
pub use inputs::{DecodedInputs, InputValue};
pub use job::{Job, JobId, JobOutcome, JobStatus};
pub use journal::{JobJournal, JobJournalFactory, JournalEntry};
pub use manifest::ProcessManifest;
pub use registry::{CatalogResolver, Process, ProcessRegistry, ProcessResolver, ScriptResolver};
pub use request::{ExecutionMode, ExecutionRequest, ResponseFormat};
