//! # Configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults (`keydir = "/opt/ejson/keys"`)
//! 2. `~/.ejson/config.toml`, if it exists
//! 3. An explicit config file passed by the caller (must exist)
//! 4. `EJSON_*` environment variables, e.g. `EJSON_KEYDIR`
//!
//! Command-line flags are applied on top by the binary.

use crate::error::{EjsonError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_KEYDIR: &str = "/opt/ejson/keys";
const ENV_PREFIX: &str = "EJSON";
const USER_CONFIG_DIR: &str = ".ejson";
const USER_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Directory searched for private keys
    pub keydir: PathBuf,
}

impl Settings {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(user_config_path().as_deref(), explicit)
    }

    fn load_from(user_file: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().set_default("keydir", DEFAULT_KEYDIR)?;

        if let Some(path) = user_file {
            builder = builder.add_source(File::new(path_str(path)?, FileFormat::Toml).required(false));
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::new(path_str(path)?, FileFormat::Toml).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| EjsonError::Config(format!("Invalid config path: {}", path.display())))
}
