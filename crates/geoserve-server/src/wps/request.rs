//! Raw WPS request envelopes as they arrive on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The only accepted `service` value.
pub const WPS_SERVICE: &str = "wps";

/// The only accepted `version` value.
pub const WPS_VERSION: &str = "2.0.0";

/// WPS operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WpsOperation {
    GetCapabilities,
    DescribeProcess,
    Execute,
}

impl WpsOperation {
    pub const ALL: [WpsOperation; 3] = [
        WpsOperation::GetCapabilities,
        WpsOperation::DescribeProcess,
        WpsOperation::Execute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WpsOperation::GetCapabilities => "GetCapabilities",
            WpsOperation::DescribeProcess => "DescribeProcess",
            WpsOperation::Execute => "Execute",
        }
    }
}

impl FromStr for WpsOperation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|op| op.as_str() == s).ok_or(())
    }
}

impl fmt::Display for WpsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string of `GET /wps`. Every field is optional on the wire so the
/// validator can classify what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WpsQuery {
    pub service: Option<String>,
    pub version: Option<String>,
    pub request: Option<String>,
    pub identifier: Option<String>,
    pub response_format: Option<String>,
    pub mode: Option<String>,
    /// Positional `&`-separated input blob.
    pub inputs: Option<String>,
    /// Requested output name.
    pub output: Option<String>,
}

/// Query string of `GET /wps/execute`, where the envelope is implied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQuery {
    pub identifier: Option<String>,
    pub response_format: Option<String>,
    pub mode: Option<String>,
    pub inputs: Option<String>,
    pub output: Option<String>,
}

impl From<ExecuteQuery> for WpsQuery {
    fn from(q: ExecuteQuery) -> Self {
        Self {
            service: Some(WPS_SERVICE.to_string()),
            version: Some(WPS_VERSION.to_string()),
            request: Some(WpsOperation::Execute.to_string()),
            identifier: q.identifier,
            response_format: q.response_format,
            mode: q.mode,
            inputs: q.inputs,
            output: q.output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_are_exact() {
        assert_eq!("Execute".parse(), Ok(WpsOperation::Execute));
        assert!("execute".parse::<WpsOperation>().is_err());
        assert!("DescribeProces".parse::<WpsOperation>().is_err());
    }

    #[test]
    fn test_execute_query_implies_envelope() {
        let query: WpsQuery = ExecuteQuery {
            identifier: Some("p".into()),
            ..Default::default()
        }
        .into();
        assert_eq!(query.service.as_deref(), Some("wps"));
        assert_eq!(query.version.as_deref(), Some("2.0.0"));
        assert_eq!(query.request.as_deref(), Some("Execute"));
    }
}
