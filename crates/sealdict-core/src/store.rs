//! The public artifact and the provider's side of a lookup

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::ShareSource;
use crate::error::Error;
use crate::params::Params;
use crate::sealed::SealedStore;
use crate::table::{xor_into, CompressedTable};
use crate::Result;

/// Leading bytes of a serialized [`PublicStore`]
pub const STORE_MAGIC: &[u8; 4] = b"SDT1";

/// Leading bytes of a serialized [`SealedStore`]
pub const SEALED_MAGIC: &[u8; 4] = b"SDS1";

/// Params plus compressed table. Holds nothing secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicStore {
    params: Params,
    table: CompressedTable,
}

impl PublicStore {
    /// Pair params with a table, rejecting inconsistent combinations
    pub fn new(params: Params, table: CompressedTable) -> Result<Self> {
        let store = Self { params, table };
        store.validate()?;
        Ok(store)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn table(&self) -> &CompressedTable {
        &self.table
    }

    /// XOR of rows `x` and `y`
    pub fn share(&self, x: u32, y: u32) -> Result<Vec<u8>> {
        let table_length = self.params.table_length;
        for index in [x, y] {
            if index >= table_length {
                return Err(Error::IndexOutOfRange {
                    index,
                    table_length,
                });
            }
        }

        let row_bytes = self.params.row_len();
        let mut share = self.table.fetch_row(x, row_bytes)?;
        xor_into(&mut share, &self.table.fetch_row(y, row_bytes)?);
        Ok(share)
    }

    /// Check an artifact read from an untrusted source
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.table.validate(&self.params)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = STORE_MAGIC.to_vec();
        bincode::serialize_into(&mut out, self)?;
        Ok(out)
    }

    /// Parse and validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = strip_magic(bytes, STORE_MAGIC)?;
        let store: Self = bincode::deserialize(body)?;
        store.validate()?;
        Ok(store)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }
}

impl ShareSource for PublicStore {
    fn share(&self, x: u32, y: u32) -> Result<Vec<u8>> {
        PublicStore::share(self, x, y)
    }
}

/// Human-readable dump: the salt, then one `index row` line per stored row
impl fmt::Display for PublicStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", hex::encode(&self.params.salt))?;
        let row_bytes = self.params.row_len();
        for (i, index) in self.table.idx.iter().enumerate() {
            let row = &self.table.table[i * row_bytes..(i + 1) * row_bytes];
            writeln!(f, "{} {}", index, hex::encode(row))?;
        }
        Ok(())
    }
}

/// Either kind of artifact, told apart by magic
#[derive(Debug, Clone)]
pub enum StoreFile {
    Plain(PublicStore),
    Sealed(SealedStore),
}

impl StoreFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.get(..4) {
            Some(magic) if magic == STORE_MAGIC => Ok(Self::Plain(PublicStore::from_bytes(bytes)?)),
            Some(magic) if magic == SEALED_MAGIC => Ok(Self::Sealed(SealedStore::from_bytes(bytes)?)),
            _ => Err(Error::CorruptArtifact("unknown artifact magic".to_string())),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Plain(store) => store.to_bytes(),
            Self::Sealed(store) => store.to_bytes(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Sealed(_) => "sealed",
        }
    }
}

pub(crate) fn strip_magic<'a>(bytes: &'a [u8], magic: &[u8; 4]) -> Result<&'a [u8]> {
    match bytes.strip_prefix(magic.as_slice()) {
        Some(body) => Ok(body),
        None => Err(Error::CorruptArtifact(format!(
            "missing magic {}",
            String::from_utf8_lossy(magic)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_store;
    use crate::config::StoreConfig;
    use crate::keys::DictKey;

    fn sample() -> PublicStore {
        let key = DictKey::new(*b"1234123412341234");
        let items = [("hip", "pizza"), ("is", "like"), ("this", "I")];
        build_store(&key, items, &StoreConfig::default()).unwrap().1
    }

    #[test]
    fn test_share_out_of_range() {
        let store = sample();
        let length = store.params().table_length;
        assert!(store.share(0, length - 1).is_ok());
        assert!(matches!(
            store.share(length, 0),
            Err(Error::IndexOutOfRange { index, table_length }) if index == length && table_length == length
        ));
        assert!(store.share(0, u32::MAX).is_err());
    }

    #[test]
    fn test_share_is_xor_of_rows() {
        let store = sample();
        let params = store.params();
        let table = store
            .table()
            .decompress(params.table_length, params.row_len())
            .unwrap();
        let share = store.share(1, 2).unwrap();
        let mut expected = table.row(1).to_vec();
        xor_into(&mut expected, table.row(2));
        assert_eq!(share, expected);
        assert_eq!(store.share(3, 3).unwrap(), vec![0u8; params.row_len()]);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let store = sample();
        let bytes = store.to_bytes().unwrap();
        assert_eq!(&bytes[..4], STORE_MAGIC);
        assert_eq!(PublicStore::from_bytes(&bytes).unwrap(), store);
    }

    #[test]
    fn test_from_bytes_rejects_bad_magic() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            PublicStore::from_bytes(&bytes),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_truncation() {
        let bytes = sample().to_bytes().unwrap();
        assert!(PublicStore::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_inconsistent_rows() {
        let store = sample();
        let mut table = store.table().clone();
        table.idx.reverse();
        assert!(matches!(
            PublicStore::new(store.params().clone(), table.clone()),
            Err(Error::CorruptArtifact(_))
        ));

        // Same field layout as PublicStore
        let mut bytes = STORE_MAGIC.to_vec();
        bincode::serialize_into(&mut bytes, &(store.params(), &table)).unwrap();
        assert!(matches!(
            PublicStore::from_bytes(&bytes),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_new_rejects_rows_beyond_table() {
        let store = sample();
        let mut table = store.table().clone();
        let last = table.idx.len() - 1;
        table.idx[last] = store.params().table_length;
        assert!(matches!(
            PublicStore::new(store.params().clone(), table),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let store = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sdt");
        store.save(&path).unwrap();
        assert_eq!(PublicStore::load(&path).unwrap(), store);

        match StoreFile::load(&path).unwrap() {
            StoreFile::Plain(loaded) => assert_eq!(loaded, store),
            other => panic!("expected plain store, got {}", other.kind()),
        }
    }

    #[test]
    fn test_dump_format() {
        let store = sample();
        let dump = store.to_string();
        let mut lines = dump.lines();
        assert_eq!(lines.next(), Some(hex::encode(&store.params().salt).as_str()));
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), store.table().len());
        let first: Vec<&str> = rows[0].split(' ').collect();
        assert_eq!(first[0], store.table().idx[0].to_string());
        assert_eq!(first[1].len(), store.params().row_len() * 2);
    }
}
