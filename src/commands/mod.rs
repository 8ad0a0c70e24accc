pub mod decrypt;
pub mod encrypt;
pub mod env;
pub mod keygen;

pub use decrypt::decrypt;
pub use encrypt::encrypt;
pub use env::env;
pub use keygen::keygen;

use anyhow::{Context, Result};
use ejson::config::Settings;
use ejson::{KeyDir, KeySource};
use std::io::{self, Read};

/// Pick the private key source: stdin when asked, otherwise the key directory.
fn key_source(settings: &Settings, key_from_stdin: bool) -> Result<KeySource> {
    if key_from_stdin {
        let mut pem = String::new();
        io::stdin()
            .read_to_string(&mut pem)
            .context("failed to read private key from stdin")?;
        return Ok(KeySource::Inline(pem.trim().to_string()));
    }
    Ok(KeySource::Directory(KeyDir::new(&settings.keydir)))
}
