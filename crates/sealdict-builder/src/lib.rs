//! sealdict-builder: compile a JSON map into a store artifact
//!
//! Input is a JSON object of string keys to string values. Keys are derived
//! from a password, so the same password and KDF salt later rebuild the
//! client context from the published params alone.

use std::path::Path;

use anyhow::{Context, Result};
use sealdict_core::{
    build_sealed, build_store, derive_key_from_password, derive_sealed_keys, StoreConfig,
    StoreFile,
};

/// Default salt for password key derivation
pub const DEFAULT_KDF_SALT: &str = "sealdict";

/// Read a JSON object of string -> string
///
/// Entries come back in key order.
pub fn read_map<P: AsRef<Path>>(path: P) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_map(&data).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_map(data: &[u8]) -> Result<Vec<(String, String)>> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(data)?;
    map.into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Ok((k, s)),
            other => anyhow::bail!("value for {:?} is not a string: {}", k, other),
        })
        .collect()
}

/// Read a [`StoreConfig`] from JSON; missing fields take their defaults
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<StoreConfig> {
    let path = path.as_ref();
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let config: StoreConfig = serde_json::from_slice(&data)?;
    config.validate()?;
    Ok(config)
}

/// Build a plain or sealed artifact from `items`
pub fn build_artifact(
    items: &[(String, String)],
    password: &[u8],
    kdf_salt: &[u8],
    sealed: bool,
    config: &StoreConfig,
) -> Result<StoreFile> {
    let pairs = items.iter().map(|(k, v)| (k.as_bytes(), v.as_bytes()));
    let file = if sealed {
        let keys = derive_sealed_keys(password, kdf_salt);
        let (_, store) = build_sealed(&keys, pairs, config)?;
        StoreFile::Sealed(store)
    } else {
        let key = derive_key_from_password(password, kdf_salt);
        let (_, store) = build_store(&key, pairs, config)?;
        StoreFile::Plain(store)
    };
    Ok(file)
}
