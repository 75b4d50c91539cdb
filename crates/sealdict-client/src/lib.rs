//! sealdict-client: lookups against a remote provider
//!
//! The client computes row indices locally from its key, asks the provider
//! for the XOR of those rows, and decodes the answer. The provider sees only
//! the two indices.

pub mod client;
pub mod error;

pub use client::{nonces_name, StoreClient, UploadResponse, NONCES_SUFFIX};
pub use error::ClientError;
