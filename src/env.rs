//! Shell export of a decrypted document's `"environment"` section.
//!
//! Only string values are exported. Keys that are not valid shell variable
//! names are skipped with a warning.

use crate::document::Node;
use crate::error::{EjsonError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::warn;

pub const ENVIRONMENT_FIELD: &str = "environment";

fn variable_name() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\A[A-Za-z_][A-Za-z0-9_]*\z").expect("variable name pattern is a valid regex")
    })
}

/// Collect the string values of the top-level `"environment"` mapping.
pub fn extract_env(root: &Node) -> Result<BTreeMap<String, String>> {
    let Node::Mapping(entries) = root
        .get(ENVIRONMENT_FIELD)
        .ok_or(EjsonError::MissingEnvironment)?
    else {
        return Err(EjsonError::InvalidEnvironment);
    };

    let mut values = BTreeMap::new();
    for (key, value) in entries {
        let Some(text) = value.as_str() else {
            continue;
        };
        if !variable_name().is_match(key) {
            warn!(key = %key, "skipping environment key that is not a valid variable name");
            continue;
        }
        values.insert(key.clone(), text.to_string());
    }
    Ok(values)
}

/// Write one `export KEY='value'` line per entry.
pub fn export_env(out: &mut impl Write, values: &BTreeMap<String, String>) -> io::Result<()> {
    for (key, value) in values {
        writeln!(out, "export {}={}", key, shell_quote(value))?;
    }
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
