use anyhow::{Context, Result};
use ejson::config::Settings;
use ejson::keygen::generate_keypair;
use ejson::KeyDir;

/// Generate a key pair, printing both halves or, given settings, storing
/// the private one in their key directory
pub fn keygen(write_to: Option<&Settings>, bits: u32) -> Result<()> {
    let pair = generate_keypair(bits).context("key generation failed")?;

    if let Some(settings) = write_to {
        let keydir = KeyDir::new(&settings.keydir);
        let path = keydir
            .store(&pair)
            .with_context(|| format!("failed to store private key in {}", keydir.path().display()))?;
        eprintln!("Private key written to {}", path.display());
        print!("{}", pair.public_pem);
    } else {
        println!("Public Key:\n{}", pair.public_pem);
        println!("Private Key:\n{}", pair.private_pem);
    }

    Ok(())
}
