//! # Tree Walker
//!
//! Rebuilds a document tree with every secret string encrypted or decrypted.
//!
//! ## Which strings are secret
//!
//! A string is secret unless the mapping key it hangs from starts with `_`.
//! The exemption covers exactly the key's own value:
//!
//! - `{"_a": "b"}`: `"b"` is left alone.
//! - `{"_a": ["b", ["c"]]}`: `"b"` and `"c"` are left alone, since sequences
//!   carry their key's status down to their elements.
//! - `{"_k": {"a": "b"}}`: `"b"` is encrypted. A nested mapping key resets
//!   the status, so comments never shield a whole subtree.
//! - `{"k": {"_a": "b"}}`: `"b"` is left alone.
//!
//! Numbers, booleans and nulls are never touched. The top-level
//! `_public_key` is a comment by this rule.
//!
//! ## Failure
//!
//! The first failing string aborts the whole walk. No partially processed
//! tree is ever returned.

use crate::document::{is_comment_key, Node};
use crate::envelope::{self, KeyPair, PublicKey};
use crate::error::Result;
use crate::keydir::KeyDir;
use tracing::debug;

/// Transformation applied to each secret string.
trait StringAction {
    fn apply(&self, text: &str) -> Result<String>;
}

struct Encrypter<'a> {
    public_key: &'a PublicKey,
}

impl StringAction for Encrypter<'_> {
    fn apply(&self, text: &str) -> Result<String> {
        envelope::wrap(self.public_key, text)
    }
}

struct Decrypter<'a> {
    keys: &'a KeyPair,
}

impl StringAction for Decrypter<'_> {
    fn apply(&self, text: &str) -> Result<String> {
        envelope::unwrap(self.keys, text)
    }
}

fn walk(node: &Node, action: &impl StringAction, comment: bool) -> Result<Node> {
    match node {
        Node::Mapping(entries) => entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), walk(value, action, is_comment_key(key))?)))
            .collect::<Result<Vec<_>>>()
            .map(Node::Mapping),
        Node::Sequence(items) => items
            .iter()
            .map(|item| walk(item, action, comment))
            .collect::<Result<Vec<_>>>()
            .map(Node::Sequence),
        Node::String(text) if !comment => action.apply(text).map(Node::String),
        Node::String(_) | Node::Scalar(_) => Ok(node.clone()),
    }
}

/// Encrypt every secret string in `root` for `public_key`.
///
/// Strings that already are envelopes are kept as they are.
pub fn encrypt_tree(root: &Node, public_key: &PublicKey) -> Result<Node> {
    walk(root, &Encrypter { public_key }, false)
}

/// Decrypt every secret string in `root` with `keys`.
pub fn decrypt_tree(root: &Node, keys: &KeyPair) -> Result<Node> {
    walk(root, &Decrypter { keys }, false)
}

/// Resolve the private key for `public_key` in `keydir` once, then decrypt.
pub fn decrypt_tree_with_keydir(
    root: &Node,
    public_key: &PublicKey,
    keydir: &KeyDir,
) -> Result<Node> {
    let resolved = keydir.resolve(public_key)?;
    debug!(
        key = %resolved.path.display(),
        skipped = resolved.warnings.len(),
        "resolved private key"
    );
    let keys = KeyPair::new(public_key.clone(), Some(resolved.private_key));
    decrypt_tree(root, &keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{render_document, Scalar};
    use crate::envelope::{is_envelope, PrivateKey};
    use crate::error::EjsonError;
    use crate::keygen::{generate_keypair, DEFAULT_KEY_BITS};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn test_keys() -> KeyPair {
        let pair = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        KeyPair::new(
            PublicKey::from_pem(&pair.public_pem).unwrap(),
            Some(PrivateKey::from_pem(&pair.private_pem).unwrap()),
        )
    }

    fn node(value: Value) -> Node {
        Node::from(value)
    }

    fn string_at<'a>(root: &'a Node, path: &[&str]) -> &'a str {
        path.iter()
            .fold(root, |n, key| n.get(key).unwrap())
            .as_str()
            .unwrap()
    }

    #[test]
    fn test_flat_comment_left_alone() {
        let keys = test_keys();
        let input = node(json!({"_name1": "value1", "name2": "value2"}));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        assert_eq!(string_at(&encrypted, &["_name1"]), "value1");
        assert!(is_envelope(string_at(&encrypted, &["name2"])));

        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_comment_does_not_shield_nested_mapping() {
        let keys = test_keys();
        let input = node(json!({"_k": {"a": "b", "_c": "d"}}));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        assert!(is_envelope(string_at(&encrypted, &["_k", "a"])));
        assert_eq!(string_at(&encrypted, &["_k", "_c"]), "d");

        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_comment_applies_through_sequences() {
        let keys = test_keys();
        let input = node(json!({"_urls": ["http://example.com", ["nested"], {"a": "b"}]}));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        let Some(Node::Sequence(items)) = encrypted.get("_urls") else {
            panic!("expected sequence");
        };
        assert_eq!(items[0], Node::String("http://example.com".into()));
        assert_eq!(items[1], Node::Sequence(vec![Node::String("nested".into())]));
        assert!(is_envelope(items[2].get("a").unwrap().as_str().unwrap()));

        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_nested_secrets_roundtrip() {
        let keys = test_keys();
        let input = node(json!({
            "secret1": {
                "_description": "desc",
                "rotation": "rotation instructions",
                "_urls": ["http://google.com"],
                "_severity": "HIGH",
                "something": ["test"],
                "secret": "some api key"
            }
        }));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        assert_eq!(string_at(&encrypted, &["secret1", "_description"]), "desc");
        assert_eq!(string_at(&encrypted, &["secret1", "_severity"]), "HIGH");
        assert!(is_envelope(string_at(&encrypted, &["secret1", "rotation"])));
        assert!(is_envelope(string_at(&encrypted, &["secret1", "secret"])));

        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_sequence_elements_encrypted_independently() {
        let keys = test_keys();
        let input = node(json!({"list": ["a", "b"]}));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        let Some(Node::Sequence(items)) = encrypted.get("list") else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 2);

        let a = items[0].as_str().unwrap();
        let b = items[1].as_str().unwrap();
        assert!(is_envelope(a) && is_envelope(b));
        assert_ne!(a, b);
        assert_eq!(envelope::unwrap(&keys, a).unwrap(), "a");
        assert_eq!(envelope::unwrap(&keys, b).unwrap(), "b");
    }

    #[test]
    fn test_non_string_scalars_untouched() {
        let keys = test_keys();
        let input = node(json!({"port": 5432, "ratio": 0.5, "enabled": true, "none": null}));

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        assert_eq!(encrypted, input);
        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_hand_built_tree_encrypts_every_string() {
        let keys = test_keys();
        let input = Node::Mapping(vec![
            ("password".into(), Node::String("hunter2".into())),
            ("port".into(), Node::Scalar(Scalar::Number(5432.into()))),
            (
                "db".into(),
                Node::Mapping(vec![
                    ("pw".into(), Node::String("s3cret".into())),
                    ("tls".into(), Node::Scalar(Scalar::Bool(true))),
                    ("replica".into(), Node::Scalar(Scalar::Null)),
                ]),
            ),
        ]);

        let encrypted = encrypt_tree(&input, &keys.public).unwrap();
        assert!(is_envelope(string_at(&encrypted, &["password"])));
        assert!(is_envelope(string_at(&encrypted, &["db", "pw"])));
        assert_eq!(encrypted.get("port"), input.get("port"));
        assert_eq!(
            encrypted.get("db").unwrap().get("tls"),
            Some(&Node::Scalar(Scalar::Bool(true)))
        );
        assert!(!render_document(&encrypted).unwrap().contains("s3cret"));

        assert_eq!(decrypt_tree(&encrypted, &keys).unwrap(), input);
    }

    #[test]
    fn test_encrypt_is_idempotent() {
        let keys = test_keys();
        let input = node(json!({"secret": "plaintext"}));

        let once = encrypt_tree(&input, &keys.public).unwrap();
        let twice = encrypt_tree(&once, &keys.public).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_encrypt_only_touches_new_plaintext() {
        let keys = test_keys();
        let encrypted = encrypt_tree(&node(json!({"secret": "plaintext"})), &keys.public).unwrap();

        let Node::Mapping(mut entries) = encrypted.clone() else {
            panic!("expected mapping");
        };
        entries.push(("secret2".into(), Node::String("more plaintext".into())));
        let reencrypted = encrypt_tree(&Node::Mapping(entries), &keys.public).unwrap();

        assert_eq!(
            string_at(&reencrypted, &["secret"]),
            string_at(&encrypted, &["secret"])
        );
        assert!(is_envelope(string_at(&reencrypted, &["secret2"])));
        assert_ne!(
            string_at(&reencrypted, &["secret2"]),
            string_at(&reencrypted, &["secret"])
        );
    }

    #[test]
    fn test_decrypt_rejects_plaintext() {
        let keys = test_keys();
        let input = node(json!({"_note": "fine", "secret": "plaintext"}));

        let result = decrypt_tree(&input, &keys);
        assert!(matches!(result, Err(EjsonError::ExpectedEncryptedString)));
    }

    #[test]
    fn test_decrypt_aborts_on_first_plaintext() {
        let keys = test_keys();
        let good = envelope::wrap(&keys.public, "ok").unwrap();
        let input = node(json!({"a": good, "b": "leaked", "c": good}));

        let result = decrypt_tree(&input, &keys);
        assert!(matches!(result, Err(EjsonError::ExpectedEncryptedString)));
    }

    #[test]
    fn test_decrypt_with_keydir() {
        let temp = TempDir::new().unwrap();
        let pair = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        fs::write(temp.path().join("key.pem"), &pair.private_pem).unwrap();
        let public = PublicKey::from_pem(&pair.public_pem).unwrap();

        let input = node(json!({"password": "hunter2"}));
        let encrypted = encrypt_tree(&input, &public).unwrap();

        let decrypted =
            decrypt_tree_with_keydir(&encrypted, &public, &KeyDir::new(temp.path())).unwrap();
        assert_eq!(decrypted, input);
    }

    #[test]
    fn test_decrypt_with_keydir_missing_key() {
        let temp = TempDir::new().unwrap();
        let keys = test_keys();
        let encrypted = encrypt_tree(&node(json!({"password": "x"})), &keys.public).unwrap();

        let result = decrypt_tree_with_keydir(&encrypted, &keys.public, &KeyDir::new(temp.path()));
        assert!(matches!(result, Err(EjsonError::MissingPrivateKey)));
    }

    #[test]
    fn test_walk_does_not_modify_input() {
        let keys = test_keys();
        let input = node(json!({"secret": "plaintext"}));
        let snapshot = input.clone();

        encrypt_tree(&input, &keys.public).unwrap();
        assert_eq!(input, snapshot);
    }
}
