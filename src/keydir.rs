//! # Key Directory
//!
//! Locates the private key that belongs to a document's public key.
//!
//! ## Layout
//!
//! A key directory is a flat directory of `*.pem` files. Each file holds
//! either an RSA private key or an X.509 certificate. Subdirectories and
//! files with other extensions are ignored.
//!
//! ## Matching
//!
//! A private key belongs to a public key when their RSA moduli are equal.
//! Exponents and certificate metadata are not compared.
//!
//! ## Leniency
//!
//! Files that cannot be loaded as either a private key or a certificate are
//! skipped. Each one is logged and reported back as a [`KeyDirWarning`], so
//! corrupt key files stay visible without making resolution fail.

use crate::envelope::{PrivateKey, PublicKey};
use crate::error::{EjsonError, Result};
use crate::keygen::KeyPairPem;
use openssl::x509::X509;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const KEY_EXTENSION: &str = "pem";

/// A `*.pem` file that was skipped during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDirWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a successful resolution.
#[derive(Debug)]
pub struct Resolved {
    pub private_key: PrivateKey,
    /// File the key was loaded from
    pub path: PathBuf,
    pub warnings: Vec<KeyDirWarning>,
}

enum Candidate {
    Private(PrivateKey),
    Certificate,
    Unreadable(String),
}

/// A directory of candidate key files.
#[derive(Debug, Clone)]
pub struct KeyDir {
    dir: PathBuf,
}

impl KeyDir {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// List the `*.pem` files directly inside the directory, sorted by path.
    pub fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == KEY_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Find the private key whose modulus equals `public_key`'s.
    pub fn resolve(&self, public_key: &PublicKey) -> Result<Resolved> {
        let mut warnings = Vec::new();

        for path in self.candidates()? {
            match load_candidate(&path) {
                Candidate::Private(key) if key.matches(public_key) => {
                    debug!(path = %path.display(), "found matching private key");
                    return Ok(Resolved {
                        private_key: key,
                        path,
                        warnings,
                    });
                }
                Candidate::Private(_) => {
                    debug!(path = %path.display(), "private key does not match");
                }
                Candidate::Certificate => {
                    debug!(path = %path.display(), "skipping certificate");
                }
                Candidate::Unreadable(reason) => {
                    warn!(path = %path.display(), "skipping unreadable key file: {reason}");
                    warnings.push(KeyDirWarning { path, reason });
                }
            }
        }

        Err(EjsonError::MissingPrivateKey)
    }

    /// Write the private half of `keypair` into the directory.
    ///
    /// The file is named after the low-order bytes of the modulus, is created
    /// with mode 0600 on Unix and is never overwritten.
    pub fn store(&self, keypair: &KeyPairPem) -> Result<PathBuf> {
        let key = PrivateKey::from_pem(&keypair.private_pem)?;
        let modulus = key.modulus();
        let name = hex::encode(&modulus[modulus.len().saturating_sub(16)..]);
        let path = self.dir.join(format!("{name}.{KEY_EXTENSION}"));

        fs::create_dir_all(&self.dir)?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        file.write_all(keypair.private_pem.as_bytes())?;

        debug!(path = %path.display(), "stored private key");
        Ok(path)
    }
}

fn load_candidate(path: &Path) -> Candidate {
    let pem = match fs::read_to_string(path) {
        Ok(pem) => pem,
        Err(e) => return Candidate::Unreadable(e.to_string()),
    };

    match PrivateKey::from_pem(&pem) {
        Ok(key) => Candidate::Private(key),
        Err(err) => {
            if X509::from_pem(pem.as_bytes()).is_ok() {
                Candidate::Certificate
            } else {
                Candidate::Unreadable(err.to_string())
            }
        }
    }
}
