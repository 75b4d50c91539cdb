//! Sealed layer: authenticated outputs on top of plain lookups
//!
//! A plain store cannot tell a modified row from an absent item. The sealed
//! layer keeps two stores built under the same indexer key:
//!
//! - `values`: AES-256-GCM ciphertexts of the outputs, with the input as
//!   associated data
//! - `nonces`: a fixed-width table holding each input's 4-byte counter
//!
//! The nonce for an input is `counter_le || nonces.salt[..8]`. Counters are
//! unique within a construction and the salt is fresh per construction, so
//! nonces do not repeat under one sealing key.
//!
//! Lookups query both stores. Both absent means the input is not stored;
//! anything else that does not authenticate is reported as tampering.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use serde::{Deserialize, Serialize};

use crate::builder::build_store;
use crate::config::StoreConfig;
use crate::context::{PrivateContext, ShareSource};
use crate::error::{ConfigError, Error};
use crate::keys::{generate_key, DictKey, SealingKey};
use crate::params::Params;
use crate::store::{strip_magic, PublicStore, SEALED_MAGIC};
use crate::{Result, MAX_ROW_BYTES};

/// AES-GCM authentication tag length
pub const AEAD_TAG_BYTES: usize = 16;

/// Width of the counter stored in the nonce table
pub const COUNTER_BYTES: usize = 4;

/// Bytes of nonce-table salt appended to the counter
const NONCE_SALT_BYTES: usize = 8;

/// Longest plaintext a sealed store can hold for a given tag length
pub fn max_sealed_output(tag_bytes: usize) -> usize {
    MAX_ROW_BYTES.saturating_sub(tag_bytes + 1 + AEAD_TAG_BYTES)
}

/// Indexer key and sealing key, drawn independently
#[derive(Debug, Clone)]
pub struct SealedKeys {
    pub dict_key: DictKey,
    pub sealing_key: SealingKey,
}

impl SealedKeys {
    pub fn generate() -> Self {
        Self {
            dict_key: generate_key(),
            sealing_key: SealingKey::generate(),
        }
    }
}

/// Public artifact of the sealed layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedStore {
    pub values: PublicStore,
    pub nonces: PublicStore,
}

impl SealedStore {
    pub fn validate(&self) -> Result<()> {
        self.values.validate()?;
        self.nonces.validate()?;
        check_nonce_params(self.nonces.params())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = SEALED_MAGIC.to_vec();
        bincode::serialize_into(&mut out, self)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = strip_magic(bytes, SEALED_MAGIC)?;
        let store: Self = bincode::deserialize(body)?;
        store.validate()?;
        Ok(store)
    }
}

/// Client state for a sealed store
#[derive(Clone)]
pub struct SealedContext {
    values: PrivateContext,
    nonces: PrivateContext,
    /// Wipes its key schedule on drop (`aes/zeroize`)
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SealedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedContext")
            .field("values", &self.values)
            .field("nonces", &self.nonces)
            .finish_non_exhaustive()
    }
}

impl SealedContext {
    pub fn new(keys: &SealedKeys, values: Params, nonces: Params) -> Result<Self> {
        check_nonce_params(&nonces)?;
        Ok(Self {
            values: PrivateContext::new(&keys.dict_key, values)?,
            nonces: PrivateContext::new(&keys.dict_key, nonces)?,
            cipher: Aes256Gcm::new(GenericArray::from_slice(keys.sealing_key.as_bytes())),
        })
    }

    /// Context for a published sealed store
    pub fn for_store(keys: &SealedKeys, store: &SealedStore) -> Result<Self> {
        Self::new(keys, store.values.params().clone(), store.nonces.params().clone())
    }

    pub fn values(&self) -> &PrivateContext {
        &self.values
    }

    pub fn nonces(&self) -> &PrivateContext {
        &self.nonces
    }

    /// Rows to request from the values and nonces stores
    pub fn indices(&self, input: &[u8]) -> ((u32, u32), (u32, u32)) {
        (self.values.indices(input), self.nonces.indices(input))
    }

    /// Interpret the two shares for `input`
    pub fn open(
        &self,
        input: &[u8],
        value_share: &[u8],
        nonce_share: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let sealed = authentic(self.values.decode(input, value_share))?;
        let counter = authentic(self.nonces.decode(input, nonce_share))?;

        match (sealed, counter) {
            (None, None) => Ok(None),
            (Some(sealed), Some(counter)) => {
                let nonce = self.nonce(&counter);
                let plaintext = self
                    .cipher
                    .decrypt(
                        GenericArray::from_slice(&nonce),
                        Payload {
                            msg: &sealed,
                            aad: input,
                        },
                    )
                    .map_err(|_| Error::Tampered)?;
                Ok(Some(plaintext))
            }
            _ => Err(Error::Tampered),
        }
    }

    /// Full lookup against the two share sources
    pub fn get<V, N>(&self, values: &V, nonces: &N, input: &[u8]) -> Result<Option<Vec<u8>>>
    where
        V: ShareSource + ?Sized,
        N: ShareSource + ?Sized,
    {
        let ((vx, vy), (nx, ny)) = self.indices(input);
        let value_share = values.share(vx, vy)?;
        let nonce_share = nonces.share(nx, ny)?;
        self.open(input, &value_share, &nonce_share)
    }

    fn nonce(&self, counter: &[u8]) -> [u8; 12] {
        seal_nonce(counter, &self.nonces.params().salt)
    }
}

fn check_nonce_params(nonces: &Params) -> Result<()> {
    if nonces.pad_enabled || nonces.max_output_len() != COUNTER_BYTES {
        return Err(Error::CorruptArtifact(
            "nonce table must hold unpadded 4-byte counters".to_string(),
        ));
    }
    if nonces.salt.len() < NONCE_SALT_BYTES {
        return Err(Error::CorruptArtifact("nonce table salt too short".to_string()));
    }
    Ok(())
}

/// Decoding errors in the sealed layer mean the rows were altered
fn authentic(decoded: Result<Option<Vec<u8>>>) -> Result<Option<Vec<u8>>> {
    match decoded {
        Err(Error::BadPadding) => Err(Error::Tampered),
        other => other,
    }
}

fn seal_nonce(counter: &[u8], nonce_salt: &[u8]) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..COUNTER_BYTES].copy_from_slice(counter);
    nonce[COUNTER_BYTES..].copy_from_slice(&nonce_salt[..NONCE_SALT_BYTES]);
    nonce
}

/// Build a sealed store
///
/// Counters follow the iteration order of `items`. Plaintexts longer than
/// [`max_sealed_output`] are rejected before any table is built.
pub fn build_sealed<I, K, V>(
    keys: &SealedKeys,
    items: I,
    config: &StoreConfig,
) -> Result<(SealedContext, SealedStore)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    config.validate()?;
    let items: Vec<(K, V)> = items.into_iter().collect();
    if items.is_empty() {
        return Err(ConfigError::EmptyMap.into());
    }
    if items.len() > u32::MAX as usize {
        return Err(ConfigError::InvalidParam {
            field: "items",
            reason: format!("{} items exceed the counter range", items.len()),
        }
        .into());
    }

    let max = max_sealed_output(config.tag_bytes);
    if let Some((_, v)) = items.iter().find(|(_, v)| v.as_ref().len() > max) {
        return Err(ConfigError::OutputTooLong {
            len: v.as_ref().len(),
            max,
        }
        .into());
    }

    let counters: Vec<(&[u8], [u8; COUNTER_BYTES])> = items
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (k.as_ref(), (i as u32).to_le_bytes()))
        .collect();
    let nonce_config = StoreConfig {
        pad_enabled: false,
        ..config.clone()
    };
    let (nonce_context, nonces) = build_store(&keys.dict_key, counters.iter().copied(), &nonce_config)?;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(keys.sealing_key.as_bytes()));
    let mut sealed = Vec::with_capacity(items.len());
    for ((input, counter), (_, output)) in counters.iter().zip(&items) {
        let nonce = seal_nonce(counter, &nonces.params().salt);
        let ciphertext = cipher
            .encrypt(
                GenericArray::from_slice(&nonce),
                Payload {
                    msg: output.as_ref(),
                    aad: input,
                },
            )
            .map_err(|e| Error::Encryption {
                reason: format!("AES-256-GCM encryption failed: {e}"),
            })?;
        sealed.push((*input, ciphertext));
    }

    let (value_context, values) = build_store(&keys.dict_key, sealed, config)?;

    tracing::debug!(
        items = items.len(),
        values_length = values.params().table_length,
        nonces_length = nonces.params().table_length,
        "sealed store built"
    );

    let context = SealedContext {
        values: value_context,
        nonces: nonce_context,
        cipher,
    };
    Ok((context, SealedStore { values, nonces }))
}
