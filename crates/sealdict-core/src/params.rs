//! Public parameters of a store

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};
use crate::MAX_ROW_BYTES;

/// Parameters shared by provider and client.
///
/// Row layout:
///
/// ```text
/// [ output | marker | zeros ][ tag ]
///   <- max_output_bytes + 1 -> <- tag_bytes ->
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Number of rows
    pub table_length: u32,
    /// Longest output the table can hold
    pub max_output_bytes: u32,
    /// `max_output_bytes + tag_bytes + 1`
    pub row_bytes: u32,
    /// Trailing zero bytes checked on lookup
    pub tag_bytes: u32,
    /// Prepended to every PRF input; fresh for each construction
    pub salt: Vec<u8>,
    /// Whether outputs carry a marker byte recording their length
    pub pad_enabled: bool,
}

impl Params {
    /// Lay out rows for the given sizes; the salt is left empty until
    /// construction picks one.
    pub fn new(
        table_length: u32,
        max_output_bytes: usize,
        tag_bytes: usize,
        pad_enabled: bool,
    ) -> Result<Self, ConfigError> {
        let row_bytes = max_output_bytes + tag_bytes + 1;
        if row_bytes > MAX_ROW_BYTES {
            return Err(ConfigError::OutputTooLong {
                len: max_output_bytes,
                max: MAX_ROW_BYTES - tag_bytes - 1,
            });
        }
        Ok(Self {
            table_length,
            max_output_bytes: max_output_bytes as u32,
            row_bytes: row_bytes as u32,
            tag_bytes: tag_bytes as u32,
            salt: Vec::new(),
            pad_enabled,
        })
    }

    pub fn row_len(&self) -> usize {
        self.row_bytes as usize
    }

    pub fn tag_len(&self) -> usize {
        self.tag_bytes as usize
    }

    pub fn max_output_len(&self) -> usize {
        self.max_output_bytes as usize
    }

    /// Check the layout invariants of params read from an untrusted source
    pub fn validate(&self) -> Result<(), Error> {
        let row_bytes = self.row_len();
        if row_bytes > MAX_ROW_BYTES {
            return Err(ConfigError::RowTooWide {
                row_bytes,
                max: MAX_ROW_BYTES,
            }
            .into());
        }
        if row_bytes != self.max_output_len() + self.tag_len() + 1 {
            return Err(Error::CorruptArtifact(format!(
                "row_bytes {} != max_output_bytes {} + tag_bytes {} + 1",
                self.row_bytes, self.max_output_bytes, self.tag_bytes
            )));
        }
        if self.tag_bytes == 0 {
            return Err(Error::CorruptArtifact("tag_bytes is zero".to_string()));
        }
        if self.table_length < 2 {
            return Err(ConfigError::TableTooSmall {
                table_length: self.table_length,
            }
            .into());
        }
        if self.salt.is_empty() {
            return Err(Error::CorruptArtifact("salt is empty".to_string()));
        }
        Ok(())
    }
}
