//! HTTP routes
//!
//! Public router, safe to expose to any client:
//!
//! | Method | Path | Body | Reply |
//! |--------|------|------|-------|
//! | GET | `/health` | | `HealthResponse` |
//! | GET | `/stores/:name/params` | | `ParamsReply` |
//! | POST | `/stores/:name/share` | `ShareRequest` | `ShareReply` |
//! | GET | `/metrics` | | Prometheus text |
//!
//! Admin router, bound separately and only when asked for:
//!
//! | Method | Path | Body | Reply |
//! |--------|------|------|-------|
//! | PUT | `/stores/:name` | artifact bytes | `UploadResponse` |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use sealdict_core::{Error as CoreError, ParamsReply, ShareReply, ShareRequest, StoreFile};
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;

use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::SharedState;

/// In-flight requests served at once
pub const DEFAULT_CONCURRENCY: usize = 256;

/// Largest accepted artifact upload
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub stores: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub kind: String,
    pub stores: Vec<String>,
}

/// Public router with the default concurrency limit
pub fn create_router(state: SharedState) -> Router {
    create_public_router(state, DEFAULT_CONCURRENCY)
}

/// Lookup and health endpoints; nothing here modifies hosted stores
pub fn create_public_router(state: SharedState, concurrency: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/stores/:name/params", get(params))
        .route("/stores/:name/share", post(share))
        .layer(ConcurrencyLimitLayer::new(concurrency))
        .with_state(state)
}

/// Store uploads
pub fn create_admin_router(state: SharedState) -> Router {
    Router::new()
        .route("/stores/:name", put(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        stores: state.len(),
    })
}

async fn params(State(state): State<SharedState>, Path(name): Path<String>) -> Json<ParamsReply> {
    match state.get(&name) {
        Some(store) => Json(ParamsReply::ok(store.params().clone())),
        None => Json(ParamsReply::not_found()),
    }
}

async fn share(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareReply>> {
    let store = state
        .get(&name)
        .ok_or_else(|| ServerError::StoreNotFound(name.clone()))?;

    match store.share(request.x, request.y) {
        Ok(share) => {
            metrics::record_share(&name);
            Ok(Json(ShareReply::ok(share)))
        }
        Err(CoreError::IndexOutOfRange { index, table_length }) => {
            tracing::debug!(store = %name, index, table_length, "Share index out of range");
            metrics::record_index_out_of_range(&name);
            Ok(Json(ShareReply::index_out_of_range()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn upload(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let file = StoreFile::from_bytes(&body).map_err(ServerError::InvalidArtifact)?;
    let kind = file.kind();
    let stores = state.insert_file(&name, file)?;

    tracing::info!(store = %name, kind, bytes = body.len(), "Installed uploaded store");
    metrics::record_upload(kind);

    Ok(Json(UploadResponse {
        kind: kind.to_string(),
        stores,
    }))
}

async fn render_metrics(State(state): State<SharedState>) -> Result<String> {
    state
        .metrics()
        .map(|handle| handle.render())
        .ok_or(ServerError::MetricsDisabled)
}
