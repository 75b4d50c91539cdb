//! sealdict store builder
//!
//! Usage:
//!   sealdict-builder --input map.json --password-file pw.txt --output users.sdt
//!   sealdict-builder --input map.json --password-file pw.txt --output vault.sds --sealed

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sealdict_builder::{build_artifact, read_config, read_map, DEFAULT_KDF_SALT};
use sealdict_core::{read_password_file, StoreConfig, StoreFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sealdict-builder")]
#[command(about = "Compile a JSON map into a sealdict store artifact")]
struct Args {
    /// JSON object of string keys to string values
    #[arg(long)]
    input: PathBuf,

    /// Output artifact
    #[arg(long, default_value = "store.sdt")]
    output: PathBuf,

    /// File holding the password keys are derived from
    #[arg(long)]
    password_file: PathBuf,

    /// Salt for password key derivation
    #[arg(long, default_value = DEFAULT_KDF_SALT)]
    kdf_salt: String,

    /// Add the authenticated sealed layer
    #[arg(long)]
    sealed: bool,

    /// JSON StoreConfig; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threads trying salts in parallel (overrides config)
    #[arg(long)]
    workers: Option<usize>,

    /// Print a hex dump of the table to stdout
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => StoreConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let items = read_map(&args.input)?;
    let password = read_password_file(&args.password_file)
        .with_context(|| format!("reading password file {}", args.password_file.display()))?;

    tracing::info!(
        input = %args.input.display(),
        items = items.len(),
        sealed = args.sealed,
        "Building store"
    );

    let start = std::time::Instant::now();
    let file = build_artifact(
        &items,
        &password,
        args.kdf_salt.as_bytes(),
        args.sealed,
        &config,
    )?;
    let elapsed = start.elapsed();

    match &file {
        StoreFile::Plain(store) => {
            let params = store.params();
            tracing::info!(
                table_length = params.table_length,
                row_bytes = params.row_bytes,
                occupied = store.table().len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Built plain store"
            );
            if args.dump {
                print!("{}", store);
            }
        }
        StoreFile::Sealed(store) => {
            tracing::info!(
                values_length = store.values.params().table_length,
                nonces_length = store.nonces.params().table_length,
                elapsed_ms = elapsed.as_millis() as u64,
                "Built sealed store"
            );
            if args.dump {
                print!("{}", store.values);
                print!("{}", store.nonces);
            }
        }
    }

    file.save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), "Wrote artifact");

    Ok(())
}
