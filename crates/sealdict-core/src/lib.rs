//! sealdict-core: private storage of key/value maps
//!
//! A client holding a secret key compiles a map into a table of fixed-width
//! rows. Each input is tied to two rows and a pad by a keyed PRF, so that
//!
//! ```text
//! table[x] ^ table[y] ^ pad == encode(output) || 0^tag_bytes
//! ```
//!
//! The table (the public artifact) goes to a storage provider, which answers
//! lookups by returning the XOR of two requested rows. Without the key the
//! provider learns neither which item was requested nor what it contains.
//!
//! This crate provides:
//! - Keyed indexing (HMAC-SHA512 over `salt || tweak || input`)
//! - Table construction by peeling a random graph over the rows
//! - Compressed table encoding used for persistence and transfer
//! - The lookup protocol for both roles
//! - A sealed layer adding AES-256-GCM integrity on top of lookups
//!
//! # Threat Model
//!
//! | Information | Provider Knowledge |
//! |-------------|--------------------|
//! | Which item was queried | NO - indices are PRF outputs |
//! | Stored outputs | NO - masked by per-input pads |
//! | Number of items (roughly) | YES - table length, non-zero row count |
//! | Query timing and frequency | YES |
//! | Tampering detected | Only with the sealed layer |
//!
//! Absent inputs are reported as found with probability about
//! `2^-(8 * tag_bytes)`.

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod keys;
pub mod messages;
pub mod params;
pub mod sealed;
pub mod store;
pub mod table;

pub use builder::{build_store, compute_table_length};
pub use config::StoreConfig;
pub use context::{PrivateContext, ShareSource};
pub use error::{ConfigError, Error};
pub use indexer::{Evaluation, KeyedIndexer};
pub use keys::{
    derive_key_from_password, derive_sealed_keys, generate_key, read_password_file, DictKey,
    SealingKey,
};
pub use messages::{ParamsReply, ParamsRequest, ParamsStatus, ShareReply, ShareRequest, ShareStatus};
pub use params::Params;
pub use sealed::{build_sealed, max_sealed_output, SealedContext, SealedKeys, SealedStore};
pub use store::{PublicStore, StoreFile, SEALED_MAGIC, STORE_MAGIC};
pub use table::{CompressedTable, Table};

pub type Result<T> = std::result::Result<T, Error>;

/// Length of the indexer key in bytes
pub const KEY_BYTES: usize = 16;

/// Output length of HMAC-SHA512, the ceiling on row width
pub const MAX_ROW_BYTES: usize = 64;

/// Marker written right after a padded output
pub const PAD_BYTE: u8 = 0x70;
