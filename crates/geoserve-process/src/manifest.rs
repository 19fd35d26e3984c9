//! Declarative process manifests.
//!
//! # Example TOML
//!
//! ```toml
//! identifier = "geoserve:wps:official:deleteRows"
//! title = "Delete rows"
//! abstract = "Remove every row of a table."
//! keywords = ["table"]
//!
//! [[inputs]]
//! name = "table"
//! type = "identifier"
//!
//! [[outputs]]
//! name = "deleted"
//! type = "integer"
//!
//! [script]
//! statements = [
//!     "DELETE FROM {{table}}",
//!     "SELECT changes() AS deleted",
//! ]
//! ```
//!
//! `identifier` is required for catalog manifests. Script manifests are
//! identified by their `file:` URI and any `identifier` they carry is ignored.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::body::SqlScriptBody;
use crate::descriptor::{DataType, Port, ProcessDescriptor};
use crate::error::{ProcessError, Result};
use crate::registry::Process;
use crate::template;

/// A parsed process manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessManifest {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub inputs: Vec<Port>,

    #[serde(default)]
    pub outputs: Vec<Port>,

    pub script: ScriptSection,
}

/// The `[script]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptSection {
    /// SQL statements run in order inside one transaction.
    pub statements: Vec<String>,
}

impl ProcessManifest {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ProcessError::InvalidManifest(format!("TOML parse error: {}", e)))
    }

    /// Load from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProcessError::InvalidManifest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Validate the manifest.
    ///
    /// Checks:
    /// - At least one statement
    /// - Port names are non-empty and unique per direction
    /// - Cardinalities are sane and single-valued
    /// - Every `{{name}}` placeholder refers to an `identifier` input
    pub fn validate(&self) -> Result<()> {
        if self.script.statements.iter().all(|s| s.trim().is_empty()) {
            return Err(ProcessError::InvalidManifest(
                "Script must have at least one statement".into(),
            ));
        }

        for (direction, ports) in [("input", &self.inputs), ("output", &self.outputs)] {
            let mut seen = HashSet::new();
            for port in ports {
                if port.name.trim().is_empty() {
                    return Err(ProcessError::InvalidManifest(format!(
                        "{} name cannot be empty",
                        direction
                    )));
                }
                if !seen.insert(port.name.as_str()) {
                    return Err(ProcessError::InvalidManifest(format!(
                        "Duplicate {} name: {}",
                        direction, port.name
                    )));
                }
                if port.max_occurs != 1 || port.min_occurs > port.max_occurs {
                    return Err(ProcessError::InvalidManifest(format!(
                        "{} '{}' must have max_occurs = 1 and min_occurs <= max_occurs",
                        direction, port.name
                    )));
                }
            }
        }

        // Optional ports cannot precede mandatory ones in a positional blob.
        let mut seen_optional = false;
        for port in &self.inputs {
            if !port.is_mandatory() {
                seen_optional = true;
            } else if seen_optional {
                return Err(ProcessError::InvalidManifest(format!(
                    "Mandatory input '{}' follows an optional one",
                    port.name
                )));
            }
        }

        for statement in &self.script.statements {
            for placeholder in template::placeholders(statement) {
                match self.inputs.iter().find(|p| p.name == placeholder.name) {
                    Some(port) if port.data_type == DataType::Identifier && port.is_mandatory() => {}
                    Some(_) => {
                        return Err(ProcessError::InvalidManifest(format!(
                            "Placeholder '{}' must refer to a mandatory identifier input",
                            placeholder.full_match
                        )));
                    }
                    None => {
                        return Err(ProcessError::InvalidManifest(format!(
                            "Placeholder '{}' refers to unknown input",
                            placeholder.full_match
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Validate and build a process under the given identifier.
    pub fn into_process(self, identifier: impl Into<String>) -> Result<Process> {
        self.validate()?;

        let descriptor = ProcessDescriptor {
            identifier: identifier.into(),
            title: self.title,
            abstract_text: self.abstract_text,
            keywords: self.keywords,
            inputs: self.inputs,
            outputs: self.outputs,
        };
        let body = SqlScriptBody::new(self.script.statements);
        Ok(Process::new(descriptor, Arc::new(body)))
    }

    /// Build a catalog process, which must name its own identifier.
    pub fn into_catalog_process(self) -> Result<Process> {
        let identifier = match self.identifier.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ProcessError::InvalidManifest(
                    "Catalog manifest needs an identifier".into(),
                ));
            }
        };
        self.into_process(identifier)
    }
}
