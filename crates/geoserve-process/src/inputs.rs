//! Decoding of the positional `&`-separated input blob.

use std::collections::HashMap;

use rusqlite::ToSql;
use rusqlite::types::{Null, ToSqlOutput};

use crate::descriptor::{DataType, Port, ProcessDescriptor};
use crate::error::{ProcessError, Result};

/// Field separator of the input blob.
pub const FIELD_SEPARATOR: char = '&';

/// A decoded input literal.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// An optional port given an empty field.
    Null,
}

impl ToSql for InputValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            InputValue::Text(s) => s.to_sql(),
            InputValue::Integer(i) => i.to_sql(),
            InputValue::Double(d) => d.to_sql(),
            InputValue::Boolean(b) => b.to_sql(),
            InputValue::Null => Null.to_sql(),
        }
    }
}

/// Input values keyed by port name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedInputs {
    values: HashMap<String, InputValue>,
}

impl DecodedInputs {
    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Text of every non-null `identifier` input, for placeholder splicing.
    pub fn identifiers<'a>(&'a self, descriptor: &'a ProcessDescriptor) -> HashMap<&'a str, &'a str> {
        descriptor
            .inputs
            .iter()
            .filter(|p| p.data_type == DataType::Identifier)
            .filter_map(|p| match self.values.get(&p.name) {
                Some(InputValue::Text(s)) => Some((p.name.as_str(), s.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Decode `blob` against the process's input ports.
///
/// Field `i` feeds input port `i`. The field count must lie between the
/// number of mandatory ports and the total number of ports. An empty blob
/// carries zero fields. An absent blob means no inputs were supplied: every
/// port decodes to [`InputValue::Null`] and the process decides what that
/// means.
pub fn decode(descriptor: &ProcessDescriptor, blob: Option<&str>) -> Result<DecodedInputs> {
    let Some(blob) = blob else {
        let values = descriptor
            .inputs
            .iter()
            .map(|p| (p.name.clone(), InputValue::Null))
            .collect();
        return Ok(DecodedInputs { values });
    };
    let fields: Vec<&str> = if blob.is_empty() {
        Vec::new()
    } else {
        blob.split(FIELD_SEPARATOR).collect()
    };

    let mandatory = descriptor.mandatory_inputs();
    let total = descriptor.inputs.len();
    if fields.len() < mandatory || fields.len() > total {
        return Err(ProcessError::InvalidInputs(format!(
            "'{}' expects between {} and {} inputs, got {}",
            descriptor.identifier,
            mandatory,
            total,
            fields.len()
        )));
    }

    let mut values = HashMap::with_capacity(total);
    for (port, field) in descriptor.inputs.iter().zip(fields.iter()) {
        values.insert(port.name.clone(), parse_field(port, field)?);
    }
    for port in descriptor.inputs.iter().skip(fields.len()) {
        if port.is_mandatory() {
            return Err(ProcessError::InvalidInputs(format!(
                "missing mandatory input '{}'",
                port.name
            )));
        }
        values.insert(port.name.clone(), InputValue::Null);
    }

    Ok(DecodedInputs { values })
}

fn parse_field(port: &Port, field: &str) -> Result<InputValue> {
    if field.is_empty() && !port.is_mandatory() {
        return Ok(InputValue::Null);
    }

    let mismatch = || {
        ProcessError::InvalidInputs(format!(
            "input '{}' expects {}, got '{}'",
            port.name, port.data_type, field
        ))
    };

    match port.data_type {
        DataType::String => Ok(InputValue::Text(field.to_string())),
        DataType::Identifier => {
            if field.trim().is_empty() {
                Err(mismatch())
            } else {
                Ok(InputValue::Text(field.trim().to_string()))
            }
        }
        DataType::Integer => field.trim().parse().map(InputValue::Integer).map_err(|_| mismatch()),
        DataType::Double => field.trim().parse().map(InputValue::Double).map_err(|_| mismatch()),
        DataType::Boolean => match field.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(InputValue::Boolean(true)),
            "false" => Ok(InputValue::Boolean(false)),
            _ => Err(mismatch()),
        },
    }
}
