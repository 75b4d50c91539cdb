//! sealdict client CLI
//!
//! Usage:
//!   sealdict-client --server http://localhost:3000 params users
//!   sealdict-client get users hip --password-file pw.txt
//!   sealdict-client get vault alice --password-file pw.txt --sealed
//!   sealdict-client --server http://localhost:3001 upload users users.sdt

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sealdict_client::StoreClient;
use sealdict_core::{
    derive_key_from_password, derive_sealed_keys, read_password_file, StoreFile,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sealdict-client")]
#[command(about = "Query and manage stores on a sealdict provider")]
struct Args {
    /// Provider base URL
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a store's public params as JSON
    Params { store: String },

    /// Look up one input
    Get {
        store: String,
        input: String,

        /// File holding the password the store was built with
        #[arg(long)]
        password_file: PathBuf,

        /// Salt for password key derivation
        #[arg(long, default_value = "sealdict")]
        kdf_salt: String,

        /// Store was built with the sealed layer
        #[arg(long)]
        sealed: bool,

        /// Print the output as hex
        #[arg(long = "hex")]
        as_hex: bool,
    },

    /// Upload a plain or sealed artifact
    Upload { store: String, path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = StoreClient::new(args.server);

    match args.command {
        Command::Params { store } => {
            let params = client.fetch_params(&store).await?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::Get {
            store,
            input,
            password_file,
            kdf_salt,
            sealed,
            as_hex,
        } => {
            let password = read_password_file(&password_file).with_context(|| {
                format!("reading password file {}", password_file.display())
            })?;
            let output = if sealed {
                let keys = derive_sealed_keys(&password, kdf_salt.as_bytes());
                let context = client.sealed_context(&keys, &store).await?;
                client.get_sealed(&context, &store, input.as_bytes()).await?
            } else {
                let key = derive_key_from_password(&password, kdf_salt.as_bytes());
                let context = client.context(&key, &store).await?;
                client.get(&context, &store, input.as_bytes()).await?
            };

            match output {
                Some(value) if as_hex => println!("{}", hex::encode(value)),
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => {
                    eprintln!("not found");
                    std::process::exit(1);
                }
            }
        }
        Command::Upload { store, path } => {
            let file = StoreFile::load(&path)
                .with_context(|| format!("reading artifact {}", path.display()))?;
            let reply = client.upload(&store, &file).await?;
            println!("uploaded {} store as {}", reply.kind, reply.stores.join(", "));
        }
    }

    Ok(())
}
