//! WPS 2.0 request validation, dispatch and response documents.

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod validator;

pub use dispatcher::WpsOperationDispatcher;
pub use request::{ExecuteQuery, WPS_SERVICE, WPS_VERSION, WpsOperation, WpsQuery};
pub use response::{
    Capabilities, ProcessOffering, ProcessOfferings, ProcessSummary, StatusInfo, WpsResponse,
};
pub use validator::{WpsRequest, WpsRequestValidator};
