mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ejson::config::Settings;
use ejson::keygen::DEFAULT_KEY_BITS;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ejson")]
#[command(version)]
#[command(about = "Manage encrypted secrets in JSON using public key encryption", long_about = None)]
struct Cli {
    /// Directory containing private keys [default: /opt/ejson/keys, env: EJSON_KEYDIR]
    #[arg(short, long, global = true)]
    keydir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// (Re-)encrypt one or more files in place
    #[command(alias = "e")]
    Encrypt {
        /// Files to encrypt
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// File to decrypt
        file: PathBuf,

        /// Write output to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the private key from stdin instead of the key directory
        #[arg(long)]
        key_from_stdin: bool,
    },

    /// Generate a new key pair
    #[command(alias = "g")]
    Keygen {
        /// Print only the public key and write the private key into the key directory
        #[arg(short, long)]
        write: bool,

        /// RSA key size in bits
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: u32,
    },

    /// Print the decrypted "environment" section as shell exports
    Env {
        /// File to decrypt
        file: PathBuf,

        /// Read the private key from stdin instead of the key directory
        #[arg(long)]
        key_from_stdin: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Settings are only loaded by subcommands that touch the key directory.
fn load_settings(config: Option<&Path>, keydir: Option<PathBuf>) -> Result<Settings> {
    let mut settings = Settings::load(config)?;
    if let Some(keydir) = keydir {
        settings.keydir = keydir;
    }
    Ok(settings)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Encrypt { files } => commands::encrypt(&files),
        Commands::Decrypt {
            file,
            output,
            key_from_stdin,
        } => {
            let settings = load_settings(config, cli.keydir)?;
            commands::decrypt(&settings, &file, output.as_deref(), key_from_stdin)
        }
        Commands::Keygen { write, bits } => {
            let settings = if write {
                Some(load_settings(config, cli.keydir)?)
            } else {
                None
            };
            commands::keygen(settings.as_ref(), bits)
        }
        Commands::Env {
            file,
            key_from_stdin,
        } => {
            let settings = load_settings(config, cli.keydir)?;
            commands::env(&settings, &file, key_from_stdin)
        }
    }
}
