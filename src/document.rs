//! # Document Serializer
//!
//! Parses JSON text into a [`Node`] tree, pulls out the embedded public key,
//! and renders trees back to pretty-printed JSON.
//!
//! Key order is preserved from input to output so that re-encrypting a file
//! produces a minimal diff.

use crate::error::{EjsonError, Result};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};

/// Top-level field holding the document's PEM certificate.
pub const PUBLIC_KEY_FIELD: &str = "_public_key";

/// Shorter `_public_key` values are treated as placeholders or truncated.
pub const MIN_PUBLIC_KEY_LEN: usize = 1000;

/// Keys starting with this marker are comments and never encrypted.
pub const COMMENT_MARKER: char = '_';

/// Whether `key` marks its value as a comment.
pub fn is_comment_key(key: &str) -> bool {
    key.starts_with(COMMENT_MARKER)
}

/// One node of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Object; keys are unique and kept in input order.
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
    String(String),
    Scalar(Scalar),
}

/// A leaf that is not a string. Walkers copy these through unchanged, so
/// the type leaves no room for text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(Number),
    Bool(bool),
    Null,
}

impl TryFrom<Value> for Scalar {
    /// The value handed back when it is a string, array or object.
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Number(n) => Ok(Scalar::Number(n)),
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::Null => Ok(Scalar::Null),
            other => Err(other),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Number(n) => Value::Number(n),
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Null => Value::Null,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Null => serializer.serialize_unit(),
        }
    }
}

impl Node {
    /// Look up `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                Node::Mapping(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::String(s) => Node::String(s),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Null => Node::Scalar(Scalar::Null),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Mapping(entries) => {
                Value::Object(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            Node::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Node::String(s) => Value::String(s),
            Node::Scalar(scalar) => Value::from(scalar),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::String(s) => serializer.serialize_str(s),
            Node::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

/// A parsed document and the certificate PEM found in it.
#[derive(Debug, Clone)]
pub struct Document {
    /// The whole tree, `_public_key` included.
    pub root: Node,
    pub public_key_pem: String,
}

/// Parse `text` and extract its `_public_key`.
pub fn parse_document(text: &str) -> Result<Document> {
    let root = Node::from(serde_json::from_str::<Value>(text)?);
    if !matches!(root, Node::Mapping(_)) {
        return Err(EjsonError::NotAMapping);
    }

    let public_key_pem = root
        .get(PUBLIC_KEY_FIELD)
        .and_then(Node::as_str)
        .filter(|pem| pem.chars().count() >= MIN_PUBLIC_KEY_LEN)
        .ok_or(EjsonError::MissingPublicKey)?
        .to_string();

    Ok(Document {
        root,
        public_key_pem,
    })
}

/// Render `node` as pretty JSON (two-space indent, trailing newline).
pub fn render_document(node: &Node) -> Result<String> {
    let mut text = serde_json::to_string_pretty(node)?;
    text.push('\n');
    Ok(text)
}
