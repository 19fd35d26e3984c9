//! Envelope validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! | # | Field | Failure |
//! |---|---|---|
//! | 1 | service | missing → `MissingService` |
//! | 2 | service | not `wps` → `WrongService` |
//! | 3 | version | missing → `MissingVersion` |
//! | 4 | version | not `2.0.0` → `WrongVersion` |
//! | 5 | request | missing → `MissingOperation` |
//! | 6 | request | unknown → `UnknownOperation` |
//! | 7 | identifier | present on GetCapabilities → `GetCapabilitiesNoIdentifierAllowed` |
//! | 8 | identifier | missing on DescribeProcess → `MissingIdentifier` |
//! | 9 | identifier | unresolvable on DescribeProcess/Execute → `UnresolvedProcess` |
//!
//! Execute-only fields are left to the dispatcher.

use geoserve_process::{Process, ProcessRegistry};
use tracing::debug;

use crate::error::WpsError;
use crate::wps::request::{WPS_SERVICE, WPS_VERSION, WpsOperation, WpsQuery};

/// A request whose envelope passed validation.
#[derive(Debug, Clone)]
pub enum WpsRequest {
    GetCapabilities,
    DescribeProcess {
        process: Process,
    },
    Execute {
        process: Process,
        response_format: Option<String>,
        mode: Option<String>,
        inputs: Option<String>,
        output: Option<String>,
    },
}

impl WpsRequest {
    pub fn operation(&self) -> WpsOperation {
        match self {
            WpsRequest::GetCapabilities => WpsOperation::GetCapabilities,
            WpsRequest::DescribeProcess { .. } => WpsOperation::DescribeProcess,
            WpsRequest::Execute { .. } => WpsOperation::Execute,
        }
    }
}

/// Validates WPS envelopes against a process registry.
pub struct WpsRequestValidator<'a> {
    registry: &'a ProcessRegistry,
}

impl<'a> WpsRequestValidator<'a> {
    pub fn new(registry: &'a ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, query: WpsQuery) -> Result<WpsRequest, WpsError> {
        match present(&query.service) {
            None => return Err(WpsError::MissingService),
            Some(s) if s != WPS_SERVICE => return Err(WpsError::WrongService),
            Some(_) => {}
        }

        match present(&query.version) {
            None => return Err(WpsError::MissingVersion),
            Some(v) if v != WPS_VERSION => return Err(WpsError::WrongVersion),
            Some(_) => {}
        }

        let operation: WpsOperation = present(&query.request)
            .ok_or(WpsError::MissingOperation)?
            .parse()
            .map_err(|_| WpsError::UnknownOperation)?;

        let identifier = present(&query.identifier);
        let request = match operation {
            WpsOperation::GetCapabilities => {
                if identifier.is_some() {
                    return Err(WpsError::GetCapabilitiesNoIdentifierAllowed);
                }
                WpsRequest::GetCapabilities
            }
            WpsOperation::DescribeProcess => {
                let identifier = identifier.ok_or(WpsError::MissingIdentifier)?;
                WpsRequest::DescribeProcess {
                    process: self.resolve(identifier)?,
                }
            }
            WpsOperation::Execute => {
                let process = self.resolve(identifier.unwrap_or_default())?;
                WpsRequest::Execute {
                    process,
                    response_format: query.response_format,
                    mode: query.mode,
                    inputs: query.inputs,
                    output: query.output.filter(|o| !o.is_empty()),
                }
            }
        };

        debug!(operation = %operation, "WPS request validated");
        Ok(request)
    }

    fn resolve(&self, identifier: &str) -> Result<Process, WpsError> {
        self.registry.resolve(identifier).ok_or_else(|| {
            debug!(identifier, "Unresolved process identifier");
            WpsError::UnresolvedProcess
        })
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETE_ROWS: &str = "geoserve:wps:official:deleteRows";

    fn registry() -> ProcessRegistry {
        ProcessRegistry::standard(&[], &[]).unwrap()
    }

    fn query(service: &str, version: &str, request: &str, identifier: &str) -> WpsQuery {
        let opt = |s: &str| Some(s.to_string());
        WpsQuery {
            service: opt(service),
            version: opt(version),
            request: opt(request),
            identifier: opt(identifier),
            ..Default::default()
        }
    }

    fn check(q: WpsQuery) -> Result<WpsOperation, WpsError> {
        let registry = registry();
        WpsRequestValidator::new(&registry)
            .validate(q)
            .map(|r| r.operation())
    }

    #[test]
    fn test_earliest_failure_wins() {
        let cases = [
            (query("", "", "", ""), WpsError::MissingService),
            (query("wsp", "", "", ""), WpsError::WrongService),
            (query("WPS", "2.0.0", "GetCapabilities", ""), WpsError::WrongService),
            (query("wps", "", "Nope", ""), WpsError::MissingVersion),
            (query("wps", "2.0.1", "", ""), WpsError::WrongVersion),
            (query("wps", "2.0.0", "", ""), WpsError::MissingOperation),
            (query("wps", "2.0.0", "DescribeProces", ""), WpsError::UnknownOperation),
            (
                query("wps", "2.0.0", "GetCapabilities", DELETE_ROWS),
                WpsError::GetCapabilitiesNoIdentifierAllowed,
            ),
            (query("wps", "2.0.0", "DescribeProcess", ""), WpsError::MissingIdentifier),
            (
                query("wps", "2.0.0", "DescribeProcess", "orbgis:wps:official:deleteRows"),
                WpsError::UnresolvedProcess,
            ),
            (
                query("wps", "2.0.0", "DescribeProcess", "file:///no/such/script.toml"),
                WpsError::UnresolvedProcess,
            ),
            (query("wps", "2.0.0", "Execute", ""), WpsError::UnresolvedProcess),
        ];

        for (q, expected) in cases {
            assert_eq!(check(q.clone()), Err(expected), "query: {q:?}");
        }
    }

    #[test]
    fn test_absent_fields_count_as_missing() {
        assert_eq!(check(WpsQuery::default()), Err(WpsError::MissingService));
    }

    #[test]
    fn test_valid_envelopes() {
        assert_eq!(
            check(query("wps", "2.0.0", "GetCapabilities", "")),
            Ok(WpsOperation::GetCapabilities)
        );
        assert_eq!(
            check(query("wps", "2.0.0", "DescribeProcess", DELETE_ROWS)),
            Ok(WpsOperation::DescribeProcess)
        );
        assert_eq!(
            check(query("wps", "2.0.0", "Execute", DELETE_ROWS)),
            Ok(WpsOperation::Execute)
        );
    }

    #[test]
    fn test_execute_fields_pass_through_unchecked() {
        let registry = registry();
        let mut q = query("wps", "2.0.0", "Execute", DELETE_ROWS);
        q.response_format = Some("docment".into());
        q.mode = Some("aut".into());

        match WpsRequestValidator::new(&registry).validate(q).unwrap() {
            WpsRequest::Execute {
                response_format,
                mode,
                ..
            } => {
                assert_eq!(response_format.as_deref(), Some("docment"));
                assert_eq!(mode.as_deref(), Some("aut"));
            }
            other => panic!("unexpected {:?}", other.operation()),
        }
    }
}
