//! `{{name}}` placeholders in script statements.
//!
//! A placeholder is replaced by the value of the `identifier` input of the
//! same name, quoted as a SQL identifier. Values that are data go through
//! `:name` bind parameters instead and never reach this module.

use std::collections::HashMap;

/// A parsed `{{name}}` occurrence in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The full match including braces, e.g. `"{{table}}"`.
    pub full_match: String,
    /// The trimmed inner name, e.g. `"table"`.
    pub name: String,
}

/// Find every `{{...}}` placeholder in a statement.
pub fn placeholders(statement: &str) -> Vec<Placeholder> {
    let mut results = Vec::new();
    let mut remaining = statement;

    while let Some(start) = remaining.find("{{") {
        if let Some(end) = remaining[start..].find("}}") {
            let full_end = start + end + 2;
            let inner = remaining[start + 2..start + end].trim();

            if !inner.is_empty() {
                results.push(Placeholder {
                    full_match: remaining[start..full_end].to_string(),
                    name: inner.to_string(),
                });
            }

            remaining = &remaining[full_end..];
        } else {
            break; // unclosed
        }
    }

    results
}

/// Quote a name as a SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace placeholders with quoted identifiers.
///
/// Returns the name of the first placeholder with no value.
pub fn render(statement: &str, identifiers: &HashMap<&str, &str>) -> Result<String, String> {
    let mut rendered = statement.to_string();
    for placeholder in placeholders(statement) {
        let value = identifiers
            .get(placeholder.name.as_str())
            .ok_or_else(|| placeholder.name.clone())?;
        rendered = rendered.replace(&placeholder.full_match, &quote_identifier(value));
    }
    Ok(rendered)
}
