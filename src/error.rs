use thiserror::Error;

#[derive(Error, Debug)]
pub enum EjsonError {
    #[error("Public key not present in document (expected \"_public_key\" with at least 1000 characters)")]
    MissingPublicKey,

    #[error("No private key matching the document's public key was found")]
    MissingPrivateKey,

    #[error("Expected an encrypted string but found plaintext (encrypt the document first)")]
    ExpectedEncryptedString,

    #[error("Unsupported envelope version: {0}")]
    UnsupportedEnvelopeVersion(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Malformed envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Top level of document must be a JSON object")]
    NotAMapping,

    #[error("\"environment\" is not set in document")]
    MissingEnvironment,

    #[error("\"environment\" is not a JSON object")]
    InvalidEnvironment,
}

impl From<config::ConfigError> for EjsonError {
    fn from(err: config::ConfigError) -> Self {
        EjsonError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EjsonError>;
