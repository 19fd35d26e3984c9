//! Validated execution parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shape of a job result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Map of output name to value.
    #[default]
    Document,
    /// The bare value of a single output.
    Raw,
}

impl FromStr for ResponseFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "raw" => Ok(Self::Raw),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Document => "document",
            Self::Raw => "raw",
        })
    }
}

/// Whether the caller waits for the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Let the engine's policy decide.
    #[default]
    Auto,
    Sync,
    Async,
}

impl FromStr for ExecutionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Sync => "sync",
            Self::Async => "async",
        })
    }
}

/// A fully validated Execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub identifier: String,
    pub response_format: ResponseFormat,
    pub mode: ExecutionMode,
    /// Positional `&`-separated input blob.
    pub inputs: Option<String>,
    /// Restrict the result to this output.
    pub output: Option<String>,
}

impl ExecutionRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            response_format: ResponseFormat::default(),
            mode: ExecutionMode::default(),
            inputs: None,
            output: None,
        }
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = Some(inputs.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!("raw".parse(), Ok(ResponseFormat::Raw));
        assert!("RAW".parse::<ResponseFormat>().is_err());
        assert_eq!("async".parse(), Ok(ExecutionMode::Async));
        assert!("later".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let req = ExecutionRequest::new("p").with_inputs("1&2");
        assert_eq!(req.response_format, ResponseFormat::Document);
        assert_eq!(req.mode, ExecutionMode::Auto);
        assert_eq!(req.inputs.as_deref(), Some("1&2"));
        assert!(req.output.is_none());
    }
}
