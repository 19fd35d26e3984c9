//! HTTP routes.

pub mod health;
pub mod jobs;
pub mod wps;

pub use health::health_routes;
pub use jobs::get_job_handler;
pub use wps::{execute_handler, wps_handler};
