//! Keyed indexing: maps inputs to two rows and a pad
//!
//! Every evaluation is HMAC-SHA512 keyed by the secret key over
//! `salt || tweak || input`, with one tweak byte per output:
//!
//! | Tweak | Output |
//! |-------|--------|
//! | `1` | row `x` |
//! | `2` | row `y` |
//! | `3` | pad (first `row_bytes` of the digest) |
//!
//! Rows are drawn by rejection sampling: the digest is cut into
//! `ceil(log2(table_length))`-bit chunks and the first chunk below
//! `table_length` is taken. Construction and lookup share this code, so the
//! two sides always agree on `(x, y, pad)`.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::ConfigError;
use crate::keys::DictKey;
use crate::params::Params;
use crate::MAX_ROW_BYTES;

type HmacSha512 = Hmac<Sha512>;

const TWEAK_X: u8 = 1;
const TWEAK_Y: u8 = 2;
const TWEAK_PAD: u8 = 3;

/// Output of the keyed indexer for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub x: u32,
    pub y: u32,
    /// `row_bytes` long
    pub pad: Vec<u8>,
}

/// PRF over inputs, bound to one key, salt and table length
#[derive(Clone)]
pub struct KeyedIndexer {
    key: DictKey,
    salt: Vec<u8>,
    table_length: u32,
    chunk_bits: u32,
    row_bytes: usize,
}

impl KeyedIndexer {
    pub fn new(key: &DictKey, params: &Params) -> Result<Self, ConfigError> {
        if params.table_length < 2 {
            return Err(ConfigError::TableTooSmall {
                table_length: params.table_length,
            });
        }
        let row_bytes = params.row_len();
        if row_bytes > MAX_ROW_BYTES {
            return Err(ConfigError::RowTooWide {
                row_bytes,
                max: MAX_ROW_BYTES,
            });
        }
        Ok(Self {
            key: key.clone(),
            salt: params.salt.clone(),
            table_length: params.table_length,
            chunk_bits: ceil_log2(params.table_length),
            row_bytes,
        })
    }

    pub fn table_length(&self) -> u32 {
        self.table_length
    }

    /// Compute `(x, y, pad)` for an input
    pub fn evaluate(&self, input: &[u8]) -> Evaluation {
        let (x, y) = self.indices(input);
        Evaluation {
            x,
            y,
            pad: self.pad(input),
        }
    }

    /// Compute the two distinct rows for an input
    pub fn indices(&self, input: &[u8]) -> (u32, u32) {
        let x = self.row(TWEAK_X, input);
        let mut y = self.row(TWEAK_Y, input);
        if x == y {
            y = (y + 1) % self.table_length;
        }
        (x, y)
    }

    /// Compute the `row_bytes`-long pad for an input
    pub fn pad(&self, input: &[u8]) -> Vec<u8> {
        let digest = self.digest(TWEAK_PAD, input);
        digest[..self.row_bytes].to_vec()
    }

    fn row(&self, tweak: u8, input: &[u8]) -> u32 {
        let digest = self.digest(tweak, input);
        let chunks = (MAX_ROW_BYTES as u32 * 8) / self.chunk_bits;
        for i in 0..chunks {
            let candidate = get_chunk(&digest, self.chunk_bits, i);
            if candidate < u64::from(self.table_length) {
                return candidate as u32;
            }
        }

        // Every chunk rejected; probability at most 2^-(512 / chunk_bits).
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) % u64::from(self.table_length)) as u32
    }

    fn digest(&self, tweak: u8, input: &[u8]) -> [u8; MAX_ROW_BYTES] {
        let mut mac = HmacSha512::new_from_slice(self.key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(&self.salt);
        mac.update(&[tweak]);
        mac.update(input);

        let mut out = [0u8; MAX_ROW_BYTES];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }
}

/// Number of bits needed to encode a value in `[0, n)`, for `n >= 2`
fn ceil_log2(n: u32) -> u32 {
    32 - (n - 1).leading_zeros()
}

/// The `i`-th `bits`-wide chunk of `bytes`, most significant bit first
fn get_chunk(bytes: &[u8], bits: u32, i: u32) -> u64 {
    let start = u64::from(i) * u64::from(bits);
    let mut value = 0u64;
    for j in 0..u64::from(bits) {
        let bit = start + j;
        let byte = bytes[(bit / 8) as usize];
        let b = (byte >> (7 - (bit % 8))) & 1;
        value = (value << 1) | u64::from(b);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(table_length: u32) -> Params {
        let mut params = Params::new(table_length, 5, 3, true).unwrap();
        params.salt = b"saltsalt".to_vec();
        params
    }

    fn key() -> DictKey {
        DictKey::new(*b"1234123412341234")
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(8), 3);
        assert_eq!(ceil_log2(9), 4);
        assert_eq!(ceil_log2(209), 8);
        assert_eq!(ceil_log2(u32::MAX), 32);
    }

    #[test]
    fn test_get_chunk_msb_first() {
        let bytes = [0b1010_0000u8, 0b1111_0000];
        assert_eq!(get_chunk(&bytes, 4, 0), 0b1010);
        assert_eq!(get_chunk(&bytes, 4, 1), 0b0000);
        assert_eq!(get_chunk(&bytes, 4, 2), 0b1111);
        assert_eq!(get_chunk(&bytes, 3, 0), 0b101);
        assert_eq!(get_chunk(&bytes, 3, 2), 0b001);
    }

    #[test]
    fn test_rejects_tiny_table() {
        let err = KeyedIndexer::new(&key(), &params(1)).err();
        assert_eq!(err, Some(ConfigError::TableTooSmall { table_length: 1 }));
        assert!(KeyedIndexer::new(&key(), &params(2)).is_ok());
    }

    #[test]
    fn test_evaluate_deterministic() {
        let indexer = KeyedIndexer::new(&key(), &params(9)).unwrap();
        let e1 = indexer.evaluate(b"hip");
        let e2 = indexer.evaluate(b"hip");
        assert_eq!(e1, e2);
        assert_eq!(e1.pad.len(), 9);
    }

    #[test]
    fn test_rows_distinct_and_in_range() {
        for table_length in [2u32, 3, 9, 100, 1000] {
            let indexer = KeyedIndexer::new(&key(), &params(table_length)).unwrap();
            for i in 0..500u32 {
                let (x, y) = indexer.indices(&i.to_le_bytes());
                assert!(x < table_length && y < table_length);
                assert_ne!(x, y);
            }
        }
    }

    #[test]
    fn test_salt_changes_output() {
        let a = KeyedIndexer::new(&key(), &params(1000)).unwrap();
        let mut other = params(1000);
        other.salt = b"othersal".to_vec();
        let b = KeyedIndexer::new(&key(), &other).unwrap();
        assert_ne!(a.evaluate(b"input"), b.evaluate(b"input"));
    }

    #[test]
    fn test_key_changes_output() {
        let a = KeyedIndexer::new(&key(), &params(1000)).unwrap();
        let b = KeyedIndexer::new(&DictKey::new([9u8; 16]), &params(1000)).unwrap();
        assert_ne!(a.pad(b"input"), b.pad(b"input"));
    }

    #[test]
    fn test_rows_roughly_uniform() {
        let table_length = 10u32;
        let indexer = KeyedIndexer::new(&key(), &params(table_length)).unwrap();
        let mut counts = vec![0u32; table_length as usize];
        for i in 0..10_000u32 {
            let (x, _) = indexer.indices(&i.to_be_bytes());
            counts[x as usize] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "count {} far from 1000", count);
        }
    }
}
