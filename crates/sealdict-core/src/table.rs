//! Row storage and the compressed encoding used on disk and on the wire
//!
//! Most rows of a freshly built table are zero (roughly half of `2.09 n`
//! rows are never touched by the peeling), so only non-zero rows are kept
//! together with their sorted row indices.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::params::Params;

/// Dense table: `len()` rows of `row_bytes` bytes, stored contiguously
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    row_bytes: usize,
    data: Vec<u8>,
}

impl Table {
    /// All-zero table
    pub fn zeroed(table_length: u32, row_bytes: usize) -> Self {
        Self {
            row_bytes,
            data: vec![0u8; table_length as usize * row_bytes],
        }
    }

    pub fn len(&self) -> usize {
        if self.row_bytes == 0 {
            0
        } else {
            self.data.len() / self.row_bytes
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn row(&self, index: u32) -> &[u8] {
        let start = index as usize * self.row_bytes;
        &self.data[start..start + self.row_bytes]
    }

    pub fn row_mut(&mut self, index: u32) -> &mut [u8] {
        let start = index as usize * self.row_bytes;
        &mut self.data[start..start + self.row_bytes]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.row_bytes)
    }

    /// Number of rows that are not all zero
    pub fn occupied(&self) -> usize {
        self.rows().filter(|row| !is_zero(row)).count()
    }
}

/// Sparse encoding of a [`Table`]
///
/// `table` holds the non-zero rows back to back, `idx[i]` is the row index
/// of the `i`-th of them. Indices are strictly ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedTable {
    pub idx: Vec<u32>,
    pub table: Vec<u8>,
}

impl CompressedTable {
    pub fn compress(table: &Table) -> Self {
        let mut idx = Vec::new();
        let mut data = Vec::new();
        for (i, row) in table.rows().enumerate() {
            if !is_zero(row) {
                idx.push(i as u32);
                data.extend_from_slice(row);
            }
        }
        Self { idx, table: data }
    }

    /// Expand back into a dense table of `table_length` rows
    ///
    /// Fails with [`Error::CorruptArtifact`] on the same inputs
    /// [`validate`](Self::validate) rejects.
    pub fn decompress(&self, table_length: u32, row_bytes: usize) -> Result<Table, Error> {
        self.check_layout(table_length, row_bytes)?;
        let mut table = Table::zeroed(table_length, row_bytes);
        for (i, &index) in self.idx.iter().enumerate() {
            table
                .row_mut(index)
                .copy_from_slice(&self.table[i * row_bytes..(i + 1) * row_bytes]);
        }
        Ok(table)
    }

    /// Row at `index`, or the zero row if it is not stored
    ///
    /// Callers bounds-check `index` against the table length.
    pub fn fetch_row(&self, index: u32, row_bytes: usize) -> Result<Vec<u8>, Error> {
        match self.idx.binary_search(&index) {
            Ok(pos) => self
                .table
                .get(pos * row_bytes..(pos + 1) * row_bytes)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| {
                    Error::CorruptArtifact(format!("row {} missing from row buffer", index))
                }),
            Err(_) => Ok(vec![0u8; row_bytes]),
        }
    }

    pub fn len(&self) -> usize {
        self.idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Check that the encoding is consistent with `params`
    pub fn validate(&self, params: &Params) -> Result<(), Error> {
        self.check_layout(params.table_length, params.row_len())
    }

    fn check_layout(&self, table_length: u32, row_bytes: usize) -> Result<(), Error> {
        if self.table.len() != self.idx.len() * row_bytes {
            return Err(Error::CorruptArtifact(format!(
                "row buffer is {} bytes, expected {} rows of {} bytes",
                self.table.len(),
                self.idx.len(),
                row_bytes
            )));
        }
        for pair in self.idx.windows(2) {
            if pair[0] >= pair[1] {
                return Err(Error::CorruptArtifact(format!(
                    "row indices not strictly ascending: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(&last) = self.idx.last() {
            if last >= table_length {
                return Err(Error::CorruptArtifact(format!(
                    "row index {} beyond table length {}",
                    last, table_length
                )));
            }
        }
        Ok(())
    }
}

/// XOR `src` into `dst` in place
#[inline]
pub fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

#[inline]
pub fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(table_length: u32) -> Params {
        let mut params = Params::new(table_length, 2, 1, true).unwrap();
        params.salt = vec![0u8; 8];
        params
    }

    fn sample() -> Table {
        let mut table = Table::zeroed(6, 4);
        table.row_mut(1).copy_from_slice(&[1, 2, 3, 4]);
        table.row_mut(4).copy_from_slice(&[0, 0, 0, 9]);
        table
    }

    #[test]
    fn test_compress_keeps_nonzero_rows() {
        let compressed = CompressedTable::compress(&sample());
        assert_eq!(compressed.idx, vec![1, 4]);
        assert_eq!(compressed.table, vec![1, 2, 3, 4, 0, 0, 0, 9]);
    }

    #[test]
    fn test_decompress_restores_table() {
        let table = sample();
        let compressed = CompressedTable::compress(&table);
        assert_eq!(compressed.decompress(6, 4).unwrap(), table);
    }

    #[test]
    fn test_all_zero_table() {
        let table = Table::zeroed(5, 4);
        let compressed = CompressedTable::compress(&table);
        assert!(compressed.is_empty());
        assert_eq!(compressed.decompress(5, 4).unwrap(), table);
        assert_eq!(table.occupied(), 0);
    }

    #[test]
    fn test_fetch_row() {
        let compressed = CompressedTable::compress(&sample());
        assert_eq!(compressed.fetch_row(1, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(compressed.fetch_row(4, 4).unwrap(), vec![0, 0, 0, 9]);
        assert_eq!(compressed.fetch_row(0, 4).unwrap(), vec![0; 4]);
        assert_eq!(compressed.fetch_row(5, 4).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_validate_accepts_compressed() {
        let compressed = CompressedTable::compress(&sample());
        assert!(compressed.validate(&params(6)).is_ok());
    }

    #[test]
    fn test_validate_rejects_corruption() {
        let good = CompressedTable::compress(&sample());

        let mut dup = good.clone();
        dup.idx = vec![1, 1];
        assert!(matches!(dup.validate(&params(6)), Err(Error::CorruptArtifact(_))));

        let mut unsorted = good.clone();
        unsorted.idx = vec![4, 1];
        assert!(matches!(unsorted.validate(&params(6)), Err(Error::CorruptArtifact(_))));

        let mut out_of_range = good.clone();
        out_of_range.idx = vec![1, 6];
        assert!(matches!(out_of_range.validate(&params(6)), Err(Error::CorruptArtifact(_))));

        let mut short = good;
        short.table.pop();
        assert!(matches!(short.validate(&params(6)), Err(Error::CorruptArtifact(_))));
    }

    #[test]
    fn test_decompress_rejects_index_beyond_table() {
        let compressed = CompressedTable {
            idx: vec![5],
            table: vec![1; 4],
        };
        assert!(matches!(
            compressed.decompress(3, 4),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_decompress_rejects_duplicate_index() {
        let compressed = CompressedTable {
            idx: vec![1, 1],
            table: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert!(matches!(
            compressed.decompress(3, 4),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_fetch_row_reports_short_buffer() {
        let compressed = CompressedTable {
            idx: vec![0, 2],
            table: vec![1; 4],
        };
        assert!(matches!(
            compressed.fetch_row(2, 4),
            Err(Error::CorruptArtifact(_))
        ));
        assert_eq!(compressed.fetch_row(0, 4).unwrap(), vec![1; 4]);
    }

    #[test]
    fn test_xor_into() {
        let mut dst = [0b1100u8, 0xff];
        xor_into(&mut dst, &[0b1010, 0x0f]);
        assert_eq!(dst, [0b0110, 0xf0]);
    }
}
