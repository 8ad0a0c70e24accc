//! # Envelope Codec
//!
//! Encrypts and decrypts single string values and defines the textual
//! envelope that marks a string as encrypted inside a JSON document.
//!
//! ## Envelope Format
//!
//! ```text
//! EJ[1,<base64 of DER-encoded PKCS#7 enveloped data>]
//! ```
//!
//! - `1` is the envelope version. It is the only version this codec speaks;
//!   any other version is rejected rather than guessed at. The version is
//!   read as a decimal integer, so `EJ[01,...]` counts as version 1.
//! - The base64 payload uses the standard alphabet with padding and is
//!   written on a single line. Decoding ignores ASCII whitespace, so payloads
//!   wrapped at 76 columns are accepted too.
//! - Trailing newlines after the closing `]` are tolerated.
//!
//! ## Algorithm
//!
//! - **Structure**: PKCS#7 / CMS enveloped data with a single recipient
//! - **Payload cipher**: AES-256-CBC under a random session key
//! - **Key transport**: session key encrypted with the recipient's RSA key
//!
//! ## Idempotence
//!
//! [`wrap`] returns a string that already is a version 1 envelope unchanged,
//! so re-encrypting a document only touches newly added plaintext values.
//! [`unwrap`] refuses plaintext with [`EjsonError::ExpectedEncryptedString`]
//! so that secrets committed in cleartext are noticed.

use crate::error::{EjsonError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::symm::Cipher;
use openssl::x509::X509;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// The only envelope version this codec produces and accepts.
pub const ENVELOPE_VERSION: u32 = 1;

fn envelope_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\AEJ\[(\d+),(.*)\]\n*\z").expect("envelope pattern is a valid regex")
    })
}

/// A string split into its envelope parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub version: &'a str,
    pub payload: &'a str,
}

impl Envelope<'_> {
    pub fn is_supported(&self) -> bool {
        self.version.parse::<u32>() == Ok(ENVELOPE_VERSION)
    }
}

/// Split `text` into an [`Envelope`] if it has the `EJ[<version>,...]` shape.
pub fn parse(text: &str) -> Option<Envelope<'_>> {
    let caps = envelope_pattern().captures(text)?;
    Some(Envelope {
        version: caps.get(1)?.as_str(),
        payload: caps.get(2)?.as_str(),
    })
}

/// Check whether `text` is in the encrypted state.
pub fn is_envelope(text: &str) -> bool {
    parse(text).is_some()
}

/// An RSA public key carried by an X.509 certificate.
#[derive(Clone)]
pub struct PublicKey {
    cert: X509,
    modulus: Vec<u8>,
}

impl PublicKey {
    /// Load a PEM-encoded certificate. The certificate must hold an RSA key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let cert = X509::from_pem(pem.as_bytes())
            .map_err(|e| EjsonError::InvalidCertificate(e.to_string()))?;
        let modulus = cert
            .public_key()
            .and_then(|key| key.rsa())
            .map_err(|e| EjsonError::InvalidCertificate(format!("not an RSA key: {e}")))?
            .n()
            .to_vec();
        Ok(Self { cert, modulus })
    }

    /// Big-endian RSA modulus.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub(crate) fn certificate(&self) -> &X509 {
        &self.cert
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("modulus", &fingerprint(&self.modulus))
            .finish()
    }
}

/// An RSA private key.
#[derive(Clone)]
pub struct PrivateKey {
    key: PKey<Private>,
    modulus: Vec<u8>,
}

impl PrivateKey {
    /// Load a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
    ///
    /// Passphrase-protected keys are rejected instead of prompting on the
    /// terminal.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = PKey::private_key_from_pem_callback(pem.as_bytes(), |_| Ok(0))
            .map_err(|e| EjsonError::InvalidPrivateKey(e.to_string()))?;
        let modulus = key
            .rsa()
            .map_err(|e| EjsonError::InvalidPrivateKey(format!("not an RSA key: {e}")))?
            .n()
            .to_vec();
        Ok(Self { key, modulus })
    }

    /// Big-endian RSA modulus.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Whether this key is the private half of `public`.
    pub fn matches(&self, public: &PublicKey) -> bool {
        self.modulus == public.modulus
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("modulus", &fingerprint(&self.modulus))
            .finish_non_exhaustive()
    }
}

fn fingerprint(modulus: &[u8]) -> String {
    hex::encode(&modulus[..modulus.len().min(8)])
}

/// A document's public key plus, when decrypting, its private counterpart.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: Option<PrivateKey>,
}

impl KeyPair {
    pub fn new(public: PublicKey, private: Option<PrivateKey>) -> Self {
        Self { public, private }
    }
}

/// Encrypt `plaintext` for `public_key` and wrap it in an envelope.
///
/// Strings that are already version 1 envelopes come back unchanged.
pub fn wrap(public_key: &PublicKey, plaintext: &str) -> Result<String> {
    if let Some(envelope) = parse(plaintext) {
        if envelope.is_supported() {
            return Ok(plaintext.to_string());
        }
        return Err(EjsonError::UnsupportedEnvelopeVersion(
            envelope.version.to_string(),
        ));
    }

    let mut recipients = Stack::new()?;
    recipients.push(public_key.certificate().clone())?;

    let der = Pkcs7::encrypt(
        &recipients,
        plaintext.as_bytes(),
        Cipher::aes_256_cbc(),
        Pkcs7Flags::BINARY,
    )
    .and_then(|pkcs7| pkcs7.to_der())
    .map_err(|e| EjsonError::Encryption(e.to_string()))?;

    Ok(format!("EJ[{},{}]", ENVELOPE_VERSION, STANDARD.encode(der)))
}

/// Decrypt an envelope produced by [`wrap`].
pub fn unwrap(keys: &KeyPair, text: &str) -> Result<String> {
    let envelope = parse(text).ok_or(EjsonError::ExpectedEncryptedString)?;
    if !envelope.is_supported() {
        return Err(EjsonError::UnsupportedEnvelopeVersion(
            envelope.version.to_string(),
        ));
    }
    let private_key = keys.private.as_ref().ok_or(EjsonError::MissingPrivateKey)?;

    let compact: String = envelope
        .payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| EjsonError::InvalidEnvelope(format!("bad base64: {e}")))?;
    let pkcs7 = Pkcs7::from_der(&der)
        .map_err(|e| EjsonError::InvalidEnvelope(format!("bad PKCS#7 structure: {e}")))?;

    let plaintext = pkcs7
        .decrypt(&private_key.key, keys.public.certificate(), Pkcs7Flags::empty())
        .map_err(|e| EjsonError::Decryption(e.to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| EjsonError::Decryption("plaintext is not valid UTF-8".into()))
}
