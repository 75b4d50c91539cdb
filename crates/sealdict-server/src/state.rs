//! Registry of hosted stores
//!
//! Readers take a lock-free snapshot of the name -> store map. Uploads build
//! a new map and swap it in, so a lookup never sees a half-installed store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics_exporter_prometheus::PrometheusHandle;
use sealdict_core::{PublicStore, StoreFile};

use crate::error::{Result, ServerError};

/// Suffix under which the nonce table of a sealed store is registered
pub const NONCES_SUFFIX: &str = ".nonces";

type StoreMap = HashMap<String, Arc<PublicStore>>;

pub struct ServerState {
    stores: ArcSwap<StoreMap>,
    metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<ServerState>;

impl ServerState {
    pub fn new() -> Self {
        Self {
            stores: ArcSwap::from_pointee(HashMap::new()),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this recorder
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<Arc<PublicStore>> {
        self.stores.load().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.stores.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hosted store names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Install or replace one store
    pub fn insert(&self, name: &str, store: PublicStore) -> Result<()> {
        validate_name(name)?;
        self.install(vec![(name.to_string(), store)], None);
        Ok(())
    }

    /// Install an artifact under `name`
    ///
    /// Sealed artifacts register two stores, `name` for values and
    /// `name.nonces` for counters. A plain artifact drops any `name.nonces`
    /// left by an earlier sealed upload. Returns the registered names.
    pub fn insert_file(&self, name: &str, file: StoreFile) -> Result<Vec<String>> {
        validate_name(name)?;
        let nonces = format!("{}{}", name, NONCES_SUFFIX);
        let (entries, stale) = match file {
            StoreFile::Plain(store) => (vec![(name.to_string(), store)], Some(nonces)),
            StoreFile::Sealed(sealed) => (
                vec![(name.to_string(), sealed.values), (nonces, sealed.nonces)],
                None,
            ),
        };
        let names = entries.iter().map(|(n, _)| n.clone()).collect();
        self.install(entries, stale.as_deref());
        Ok(names)
    }

    /// Load an artifact from disk and install it
    pub fn load_file<P: AsRef<Path>>(&self, name: &str, path: P) -> Result<Vec<String>> {
        let file = StoreFile::load(path.as_ref())?;
        tracing::info!(
            name,
            path = %path.as_ref().display(),
            kind = file.kind(),
            "Loaded store"
        );
        self.insert_file(name, file)
    }

    fn install(&self, entries: Vec<(String, PublicStore)>, remove: Option<&str>) {
        let entries: Vec<(String, Arc<PublicStore>)> = entries
            .into_iter()
            .map(|(name, store)| (name, Arc::new(store)))
            .collect();
        self.stores.rcu(|current| {
            let mut next = StoreMap::clone(current);
            if let Some(stale) = remove {
                next.remove(stale);
            }
            for (name, store) in &entries {
                next.insert(name.clone(), Arc::clone(store));
            }
            next
        });
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_shared_state(state: ServerState) -> SharedState {
    Arc::new(state)
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ServerError::InvalidName(name.to_string()))
    }
}
