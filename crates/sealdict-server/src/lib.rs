//! sealdict-server: storage provider for sealdict stores
//!
//! Hosts any number of named public stores and answers share requests
//! against them. The server only ever sees row indices and returns XORs of
//! rows; it holds no key material.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ServerError;
pub use metrics::init_prometheus_recorder;
pub use routes::{
    create_admin_router, create_public_router, create_router, HealthResponse, UploadResponse,
};
pub use state::{create_shared_state, ServerState, SharedState, NONCES_SUFFIX};
