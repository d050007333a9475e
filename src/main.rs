//! Strongroom Media - CLI
//!
//! Command-line access to key derivation, vault decryption and reference
//! classification.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use strongroom_media::config::MediaVaultConfig;
use strongroom_media::crypto::{self, DerivedKey};
use strongroom_media::media::{MediaIdentityResolver, MediaReference, MediaStore};
use strongroom_media::vault_file::VaultFile;
use strongroom_media::VaultResult;

#[derive(Parser)]
#[command(name = "strongroom")]
#[command(version = strongroom_media::VERSION)]
#[command(about = "Strongroom media vault tools")]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a hex vault key from a password and salt
    DeriveKey {
        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        salt: String,

        /// PBKDF2 iterations (config value if omitted)
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Key size in bits (config value if omitted)
        #[arg(short, long)]
        bits: Option<u32>,
    },

    /// Decrypt a vault file
    Decrypt {
        /// Encrypted vault file
        file: PathBuf,

        /// Hex encoded key
        #[arg(short, long)]
        key: String,

        /// Output path, stdout if omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show how a media reference would be resolved
    Classify {
        uri: String,
    },

    /// Run the key derivation self-test
    SelfTest,
}

/// Media index for offline use: nothing is indexed
struct OfflineStore;

impl MediaStore for OfflineStore {
    fn query(&self, _: &str, _: &str, _: Option<&str>, _: &[&str]) -> VaultResult<Option<String>> {
        Ok(None)
    }

    fn delete(&self, _: &str) -> VaultResult<usize> {
        Ok(0)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => MediaVaultConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MediaVaultConfig::default(),
    };

    match cli.command {
        Commands::DeriveKey { password, salt, iterations, bits } => {
            let key = crypto::derive_key_hex(
                &password,
                &salt,
                iterations.unwrap_or(config.kdf.iterations),
                bits.unwrap_or(config.kdf.key_bits),
            )?;
            println!("{}", key);
        }

        Commands::Decrypt { file, key, out } => {
            let key = DerivedKey::from_hex(&key)?;
            let mut vault_file = VaultFile::new(&file, key);
            let stream = vault_file
                .decrypted_stream()
                .with_context(|| format!("opening {}", file.display()))?;

            let written = match &out {
                Some(path) => {
                    let mut writer = BufWriter::new(File::create(path)?);
                    let n = io::copy(stream, &mut writer)?;
                    writer.flush()?;
                    n
                }
                None => io::copy(stream, &mut io::stdout().lock())?,
            };
            vault_file.release();

            log::info!("Decrypted {} bytes from {}", written, file.display());
        }

        Commands::Classify { uri } => {
            println!("reference: {}", MediaReference::parse(&uri));

            let resolver = MediaIdentityResolver::new(Arc::new(OfflineStore), config.storage);
            match resolver.file_path(&uri)? {
                Some(path) => println!("path:      {}", path),
                None => println!("path:      (needs the device media index)"),
            }
        }

        Commands::SelfTest => {
            if !crypto::self_test()? {
                bail!("key derivation self-test failed");
            }
            println!("Key derivation self-test passed");
        }
    }

    Ok(())
}
