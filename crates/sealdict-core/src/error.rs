//! Error types for construction and lookup

use thiserror::Error;

/// Sizing and input problems detected before any graph work.
///
/// These are fatal: retrying with a fresh salt cannot fix them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("map has no items")]
    EmptyMap,

    #[error("output of {len} bytes too long: at most {max} bytes fit in a row")]
    OutputTooLong { len: usize, max: usize },

    #[error("input appears more than once in the map")]
    DuplicateInput,

    #[error("unpadded tables need every output to be {expected} bytes, found {actual}")]
    UnevenOutputs { expected: usize, actual: usize },

    #[error("table too small: length {table_length}, need at least 2")]
    TableTooSmall { table_length: u32 },

    #[error("row of {row_bytes} bytes exceeds the {max} byte PRF output")]
    RowTooWide { row_bytes: usize, max: usize },

    #[error("invalid parameter {field}: {reason}")]
    InvalidParam { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("construction failed after {attempts} attempts")]
    ConstructionFailed { attempts: usize },

    #[error("index {index} out of range for table of length {table_length}")]
    IndexOutOfRange { index: u32, table_length: u32 },

    #[error("authentication failed: stored rows were modified")]
    Tampered,

    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    #[error("tag matched but output padding is malformed")]
    BadPadding,

    #[error("share is {actual} bytes, expected {expected}")]
    ShareLength { expected: usize, actual: usize },

    #[error("key is {actual} bytes, expected {expected}")]
    BadKeyLength { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a fresh construction attempt could succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConstructionFailed { .. })
    }
}
