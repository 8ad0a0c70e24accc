use anyhow::{Context, Result};
use std::path::PathBuf;

/// Encrypt each file in place
pub fn encrypt(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let written = ejson::encrypt_file_in_place(path)
            .with_context(|| format!("encryption failed for {}", path.display()))?;
        println!("Wrote {} bytes to {}", written, path.display());
    }
    Ok(())
}
