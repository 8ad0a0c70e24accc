use anyhow::{Context, Result};
use ejson::config::Settings;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Decrypt a file to stdout or to `output`
pub fn decrypt(
    settings: &Settings,
    file: &Path,
    output: Option<&Path>,
    key_from_stdin: bool,
) -> Result<()> {
    let keys = super::key_source(settings, key_from_stdin)?;
    let decrypted = ejson::decrypt_file(file, &keys)
        .with_context(|| format!("decryption failed for {}", file.display()))?;

    match output {
        Some(out) => {
            fs::write(out, &decrypted)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {} bytes to {}", decrypted.len(), out.display());
        }
        None => io::stdout().write_all(decrypted.as_bytes())?,
    }

    Ok(())
}
