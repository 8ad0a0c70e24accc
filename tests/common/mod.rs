use assert_cmd::{cargo::cargo_bin_cmd, Command};
use ejson::keygen::{generate_keypair, KeyPairPem, DEFAULT_KEY_BITS};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp directory with a key pair whose private half sits in `keys/`.
pub struct Fixture {
    pub temp: TempDir,
    pub keypair: KeyPairPem,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let keypair = generate_keypair(DEFAULT_KEY_BITS).expect("failed to generate keypair");

        let keydir = temp.path().join("keys");
        fs::create_dir(&keydir).expect("failed to create keydir");
        fs::write(keydir.join("private.pem"), &keypair.private_pem)
            .expect("failed to write private key");

        Self { temp, keypair }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn keydir(&self) -> PathBuf {
        self.temp.path().join("keys")
    }

    /// Build a document embedding this fixture's public key ahead of `fields`.
    pub fn document(&self, fields: Value) -> Value {
        let mut map = Map::new();
        map.insert("_public_key".into(), Value::String(self.keypair.public_pem.clone()));
        if let Value::Object(extra) = fields {
            map.extend(extra);
        }
        Value::Object(map)
    }

    /// Write `doc` as pretty JSON to `name` inside the temp dir.
    pub fn write_document(&self, name: &str, doc: &Value) -> PathBuf {
        let path = self.temp.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
        path
    }
}

/// Read a JSON file back into a value.
#[allow(dead_code)]
pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Spawn the ejson binary with a clean environment for configuration.
#[allow(dead_code)]
pub fn ejson_cmd(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("ejson");
    cmd.env_remove("EJSON_KEYDIR").env("HOME", home);
    cmd
}
