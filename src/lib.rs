//! # ejson
//!
//! Commit secrets to source control inside ordinary JSON documents. Every
//! string value is encrypted in place with a public key embedded in the
//! document, so the structure and the non-secret fields stay readable and
//! diffable while only holders of the private key can read the secrets.
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate a key pair; the private key goes into the key directory
//! ejson --keydir ./keys keygen --write > public.pem
//!
//! # Write a document embedding the public key, then encrypt it in place
//! ejson encrypt secrets.ejson
//!
//! # Decrypt to stdout
//! ejson --keydir ./keys decrypt secrets.ejson
//! ```
//!
//! ## Document Format
//!
//! ```json
//! {
//!   "_public_key": "-----BEGIN CERTIFICATE-----\n...",
//!   "_note": "keys starting with an underscore are never encrypted",
//!   "database": {
//!     "password": "EJ[1,MIIB...]"
//!   }
//! }
//! ```
//!
//! - `_public_key` holds a PEM X.509 certificate (at least 1000 characters)
//! - Keys starting with `_` mark their own value as a comment. The mark covers
//!   strings in sequences under the key but is reset by nested mapping keys.
//! - Numbers, booleans and nulls are stored as they are.
//!
//! ## Envelope Format
//!
//! ```text
//! EJ[1,<base64 DER PKCS#7 enveloped data, AES-256-CBC, RSA key transport>]
//! ```
//!
//! Encrypting an envelope again is a no-op. Decrypting a plaintext string is
//! an error, which is how secrets committed in cleartext get noticed.
//!
//! ## Private Keys
//!
//! Decryption scans a key directory (default `/opt/ejson/keys`, override
//! with `--keydir` or `EJSON_KEYDIR`) for a `*.pem` private key whose RSA
//! modulus matches the document's certificate.
//!
//! ## Module Overview
//!
//! - [`envelope`] - Single-string encryption and the `EJ[1,...]` format
//! - [`keydir`] - Private key lookup by modulus
//! - [`document`] - JSON parsing, public key extraction, rendering
//! - [`walker`] - Recursive encrypt/decrypt of a document tree
//! - [`keygen`] - RSA key and certificate generation
//! - [`env`] - Shell export of a decrypted `"environment"` section
//! - [`config`] - Layered settings
//! - [`error`] - Error types
//!
//! ## Testing
//!
//! ```bash
//! # Unit tests
//! cargo test --lib
//!
//! # CLI workflows
//! cargo test --test cli_test
//!
//! # Library-level properties (round-trip, idempotence, comments)
//! cargo test --test codec_test
//! ```

pub mod config;
pub mod document;
pub mod env;
pub mod envelope;
pub mod error;
pub mod keydir;
pub mod keygen;
pub mod walker;

pub use document::{parse_document, render_document, Document, Node, Scalar};
pub use envelope::{KeyPair, PrivateKey, PublicKey};
pub use error::{EjsonError, Result};
pub use keydir::{KeyDir, KeyDirWarning, Resolved};

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Where the private key for decryption comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Scan a directory of `*.pem` files
    Directory(KeyDir),
    /// A PEM private key supplied directly, e.g. read from stdin
    Inline(String),
}

/// Encrypt every plaintext secret in a document, returning the new text.
pub fn encrypt(text: &str) -> Result<String> {
    let doc = parse_document(text)?;
    let public = PublicKey::from_pem(&doc.public_key_pem)?;
    let encrypted = walker::encrypt_tree(&doc.root, &public)?;
    render_document(&encrypted)
}

/// Decrypt a document into a tree.
pub fn decrypt_document(text: &str, keys: &KeySource) -> Result<Node> {
    let doc = parse_document(text)?;
    let public = PublicKey::from_pem(&doc.public_key_pem)?;
    match keys {
        KeySource::Directory(keydir) => walker::decrypt_tree_with_keydir(&doc.root, &public, keydir),
        KeySource::Inline(pem) => {
            let private = PrivateKey::from_pem(pem)?;
            if !private.matches(&public) {
                return Err(EjsonError::MissingPrivateKey);
            }
            walker::decrypt_tree(&doc.root, &KeyPair::new(public, Some(private)))
        }
    }
}

/// Decrypt a document, returning the rendered text.
pub fn decrypt(text: &str, keys: &KeySource) -> Result<String> {
    render_document(&decrypt_document(text, keys)?)
}

/// Encrypt a file and write the result back over it.
///
/// Nothing is written unless the whole document encrypts. The new text goes
/// to a temporary file in the same directory which is then renamed over the
/// original, so a failed write leaves the old contents in place. The file
/// keeps its permissions. Returns the number of bytes written.
pub fn encrypt_file_in_place(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let encrypted = encrypt(&text)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(encrypted.as_bytes())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = encrypted.len(), "encrypted file in place");
    Ok(encrypted.len())
}

/// Read and decrypt a file.
pub fn decrypt_file(path: impl AsRef<Path>, keys: &KeySource) -> Result<String> {
    decrypt(&fs::read_to_string(path)?, keys)
}
