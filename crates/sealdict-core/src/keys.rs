//! Secret keys and key derivation
//!
//! Keys zero their memory when dropped. Password derivation uses
//! PBKDF2-HMAC-SHA256; the rest of the crate treats it as an opaque source.

use std::fmt;
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;
use crate::sealed::SealedKeys;
use crate::KEY_BYTES;

/// PBKDF2 iteration count
pub const KDF_ROUNDS: u32 = 4096;

/// Length of the AES-256-GCM sealing key
pub const SEALING_KEY_BYTES: usize = 32;

/// Key for the keyed indexer
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DictKey([u8; KEY_BYTES]);

impl DictKey {
    pub fn new(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, which must be exactly `KEY_BYTES` long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let key: [u8; KEY_BYTES] = bytes.try_into().map_err(|_| Error::BadKeyLength {
            expected: KEY_BYTES,
            actual: bytes.len(),
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DictKey(<redacted>)")
    }
}

/// Key for sealing outputs, independent of the indexer key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; SEALING_KEY_BYTES]);

impl SealingKey {
    pub fn new(bytes: [u8; SEALING_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let key: [u8; SEALING_KEY_BYTES] =
            bytes.try_into().map_err(|_| Error::BadKeyLength {
                expected: SEALING_KEY_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }

    pub fn generate() -> Self {
        let mut key = [0u8; SEALING_KEY_BYTES];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; SEALING_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealingKey(<redacted>)")
    }
}

/// Generate a fresh, random indexer key
pub fn generate_key() -> DictKey {
    let mut key = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut key);
    DictKey(key)
}

/// Read a password from a file, dropping one trailing newline
///
/// The buffer is wiped when the returned value is dropped.
pub fn read_password_file<P: AsRef<Path>>(path: P) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut password = Zeroizing::new(std::fs::read(path)?);
    if password.last() == Some(&b'\n') {
        password.pop();
    }
    Ok(password)
}

/// Derive an indexer key from a password
pub fn derive_key_from_password(password: &[u8], salt: &[u8]) -> DictKey {
    let mut key = [0u8; KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KDF_ROUNDS, &mut key);
    let derived = DictKey(key);
    key.zeroize();
    derived
}

/// Derive both sealed-layer keys from one password
///
/// The first 16 bytes of output key the indexer, the next 32 the cipher.
pub fn derive_sealed_keys(password: &[u8], salt: &[u8]) -> SealedKeys {
    let mut okm = [0u8; KEY_BYTES + SEALING_KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KDF_ROUNDS, &mut okm);

    let mut dict = [0u8; KEY_BYTES];
    let mut sealing = [0u8; SEALING_KEY_BYTES];
    dict.copy_from_slice(&okm[..KEY_BYTES]);
    sealing.copy_from_slice(&okm[KEY_BYTES..]);
    okm.zeroize();

    let keys = SealedKeys {
        dict_key: DictKey(dict),
        sealing_key: SealingKey(sealing),
    };
    dict.zeroize();
    sealing.zeroize();
    keys
}
