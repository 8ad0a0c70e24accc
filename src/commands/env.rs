use anyhow::{Context, Result};
use ejson::config::Settings;
use ejson::env::{export_env, extract_env};
use std::fs;
use std::io;
use std::path::Path;

/// Print `export` lines for the document's "environment" section
pub fn env(settings: &Settings, file: &Path, key_from_stdin: bool) -> Result<()> {
    let keys = super::key_source(settings, key_from_stdin)?;
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let root = ejson::decrypt_document(&text, &keys)
        .with_context(|| format!("decryption failed for {}", file.display()))?;

    let values = extract_env(&root)?;
    export_env(&mut io::stdout().lock(), &values)?;
    Ok(())
}
