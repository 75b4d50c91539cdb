//! Prometheus metrics

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{Result, ServerError};

pub const SHARES_TOTAL: &str = "sealdict_shares_total";
pub const INDEX_OUT_OF_RANGE_TOTAL: &str = "sealdict_index_out_of_range_total";
pub const UPLOADS_TOTAL: &str = "sealdict_uploads_total";

/// Install the global Prometheus recorder
///
/// Fails if a recorder is already installed in this process.
pub fn init_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install metrics recorder: {e}")))
}

pub fn record_share(store: &str) {
    counter!(SHARES_TOTAL, "store" => store.to_string()).increment(1);
}

pub fn record_index_out_of_range(store: &str) {
    counter!(INDEX_OUT_OF_RANGE_TOTAL, "store" => store.to_string()).increment(1);
}

pub fn record_upload(kind: &'static str) {
    counter!(UPLOADS_TOTAL, "kind" => kind).increment(1);
}
