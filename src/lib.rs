//! sealdict: private key/value lookups from an untrusted storage provider
//!
//! - `sealdict_core`: construction, the lookup protocol, the sealed layer
//! - `sealdict_server`: HTTP provider hosting named stores
//! - `sealdict_client`: HTTP client running lookups against a provider
//! - `sealdict_builder`: compile JSON maps into artifacts

pub use sealdict_builder;
pub use sealdict_client;
pub use sealdict_core;
pub use sealdict_server;

pub use sealdict_core::{
    build_sealed, build_store, DictKey, Error, PrivateContext, PublicStore, SealedContext,
    SealedKeys, SealedStore, StoreConfig, StoreFile,
};
