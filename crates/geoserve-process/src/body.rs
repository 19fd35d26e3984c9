//! Executable process bodies.

use std::collections::HashMap;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Statement};
use serde_json::{Map, Number, Value};

use crate::descriptor::ProcessDescriptor;
use crate::error::{ProcessError, Result};
use crate::inputs::DecodedInputs;
use crate::template;

/// Output values keyed by output port name.
pub type Outputs = Map<String, Value>;

/// The behaviour behind a process descriptor.
///
/// Bodies run on a session worker thread with exclusive access to the
/// session database.
pub trait ProcessBody: Send + Sync {
    fn run(
        &self,
        conn: &mut Connection,
        descriptor: &ProcessDescriptor,
        inputs: &DecodedInputs,
    ) -> Result<Outputs>;
}

/// Runs a list of SQL statements in one transaction.
///
/// `:name` parameters bind the input of that name. `{{name}}` placeholders
/// are replaced by quoted identifier inputs before preparing. Outputs are read
/// from the first row of the last statement that returns columns, matched by
/// column name; outputs without a matching column are `null`.
#[derive(Debug, Clone)]
pub struct SqlScriptBody {
    statements: Vec<String>,
}

impl SqlScriptBody {
    pub fn new(statements: Vec<String>) -> Self {
        Self {
            statements: statements
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl ProcessBody for SqlScriptBody {
    fn run(
        &self,
        conn: &mut Connection,
        descriptor: &ProcessDescriptor,
        inputs: &DecodedInputs,
    ) -> Result<Outputs> {
        let identifiers = inputs.identifiers(descriptor);
        let tx = conn.transaction()?;
        let mut last_row: Option<HashMap<String, Value>> = None;

        for raw in &self.statements {
            let sql = template::render(raw, &identifiers).map_err(|name| {
                ProcessError::Execution(format!("no identifier value for '{{{{{}}}}}'", name))
            })?;
            let mut stmt = tx.prepare(&sql)?;
            bind_inputs(&mut stmt, inputs)?;

            if stmt.column_count() == 0 {
                stmt.raw_execute()?;
                continue;
            }

            let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
            let mut rows = stmt.raw_query();
            let row = match rows.next()? {
                Some(row) => {
                    let mut values = HashMap::with_capacity(names.len());
                    for (i, name) in names.iter().enumerate() {
                        values.insert(name.clone(), to_json(row.get_ref(i)?));
                    }
                    values
                }
                None => HashMap::new(),
            };
            last_row = Some(row);
        }

        tx.commit()?;

        let row = last_row.unwrap_or_default();
        Ok(descriptor
            .outputs
            .iter()
            .map(|port| {
                let value = row.get(&port.name).cloned().unwrap_or(Value::Null);
                (port.name.clone(), value)
            })
            .collect())
    }
}

fn bind_inputs(stmt: &mut Statement<'_>, inputs: &DecodedInputs) -> Result<()> {
    for index in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(index)
            .map(|n| n.trim_start_matches([':', '@', '$']).to_string())
            .ok_or_else(|| {
                ProcessError::Execution(format!("positional parameter ?{} is not supported", index))
            })?;
        let value = inputs
            .get(&name)
            .ok_or_else(|| ProcessError::Execution(format!("no input named '{}'", name)))?;
        stmt.raw_bind_parameter(index, value)?;
    }
    Ok(())
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DataType, Port};
    use crate::inputs;

    fn descriptor(inputs: Vec<Port>, outputs: Vec<Port>) -> ProcessDescriptor {
        ProcessDescriptor {
            identifier: "test".into(),
            title: String::new(),
            abstract_text: String::new(),
            keywords: vec![],
            inputs,
            outputs,
        }
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE roads (id INTEGER, name TEXT);
             INSERT INTO roads VALUES (1, 'a'), (2, 'b'), (3, 'c');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_binds_and_reads_last_row() {
        let d = descriptor(
            vec![Port::new("min", DataType::Integer)],
            vec![Port::new("total", DataType::Integer), Port::new("missing", DataType::String)],
        );
        let body = SqlScriptBody::new(vec!["SELECT count(*) AS total FROM roads WHERE id >= :min".into()]);
        let inputs = inputs::decode(&d, Some("2")).unwrap();

        let out = body.run(&mut conn(), &d, &inputs).unwrap();
        assert_eq!(out["total"], 2);
        assert_eq!(out["missing"], Value::Null);
    }

    #[test]
    fn test_identifier_splice_and_changes() {
        let d = descriptor(
            vec![Port::new("table", DataType::Identifier)],
            vec![Port::new("deleted", DataType::Integer)],
        );
        let body = SqlScriptBody::new(vec![
            "DELETE FROM {{table}}".into(),
            "SELECT changes() AS deleted".into(),
        ]);
        let inputs = inputs::decode(&d, Some("roads")).unwrap();
        let mut conn = conn();

        let out = body.run(&mut conn, &d, &inputs).unwrap();
        assert_eq!(out["deleted"], 3);
        let left: i64 = conn.query_row("SELECT count(*) FROM roads", [], |r| r.get(0)).unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_failure_rolls_back() {
        let d = descriptor(vec![], vec![]);
        let body = SqlScriptBody::new(vec![
            "DELETE FROM roads".into(),
            "SELECT * FROM no_such_table".into(),
        ]);
        let mut conn = conn();

        assert!(body.run(&mut conn, &d, &DecodedInputs::default()).is_err());
        let left: i64 = conn.query_row("SELECT count(*) FROM roads", [], |r| r.get(0)).unwrap();
        assert_eq!(left, 3);
    }

    #[test]
    fn test_unknown_parameter_fails() {
        let d = descriptor(vec![], vec![Port::new("x", DataType::String)]);
        let body = SqlScriptBody::new(vec!["SELECT :nope AS x".into()]);
        let err = body.run(&mut conn(), &d, &DecodedInputs::default()).unwrap_err();
        assert!(err.to_string().contains("no input named 'nope'"));
    }

    #[test]
    fn test_blob_becomes_hex() {
        assert_eq!(to_json(ValueRef::Blob(&[0xde, 0xad])), Value::String("dead".into()));
    }
}
