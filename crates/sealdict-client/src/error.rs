//! Client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Core error: {0}")]
    Core(#[from] sealdict_core::Error),
}

impl ClientError {
    /// Whether the server reported rows that the store does not have
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(
            self,
            ClientError::Core(sealdict_core::Error::IndexOutOfRange { .. })
        )
    }

    /// Whether a sealed lookup detected modified rows
    pub fn is_tampered(&self) -> bool {
        matches!(self, ClientError::Core(sealdict_core::Error::Tampered))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
