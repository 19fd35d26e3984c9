//! Process metadata: identifier, documentation and typed ports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal type carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
    /// A table or column name. Can be spliced into statements as a quoted
    /// SQL identifier.
    Identifier,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Identifier => "identifier",
        };
        f.write_str(s)
    }
}

fn default_occurs() -> u32 {
    1
}

/// An input or output of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "type", default = "default_data_type")]
    pub data_type: DataType,

    /// 0 makes the port optional.
    #[serde(default = "default_occurs")]
    pub min_occurs: u32,

    #[serde(default = "default_occurs")]
    pub max_occurs: u32,
}

fn default_data_type() -> DataType {
    DataType::String
}

impl Port {
    /// Mandatory single-valued port.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            data_type,
            min_occurs: 1,
            max_occurs: 1,
        }
    }

    /// Make the port optional.
    pub fn optional(mut self) -> Self {
        self.min_occurs = 0;
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.min_occurs > 0
    }
}

/// Everything a client needs to know to call a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub identifier: String,

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
}

impl ProcessDescriptor {
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Number of inputs a caller must supply.
    pub fn mandatory_inputs(&self) -> usize {
        self.inputs.iter().filter(|p| p.is_mandatory()).count()
    }
}
