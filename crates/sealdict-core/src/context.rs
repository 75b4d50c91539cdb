//! Client side of the lookup protocol
//!
//! ```text
//! client                          provider
//!   (x, y) = indices(input)
//!   ----------- ShareRequest{x, y} ---------->
//!                                   share = T[x] ^ T[y]
//!   <---------- ShareReply{share} ------------
//!   candidate = share ^ pad
//!   tag zero? -> output, else not found
//! ```

use crate::error::Error;
use crate::indexer::{Evaluation, KeyedIndexer};
use crate::keys::DictKey;
use crate::params::Params;
use crate::table::xor_into;
use crate::{Result, PAD_BYTE};

/// Anything that can answer a share request
///
/// Implemented by [`PublicStore`](crate::PublicStore) for in-process lookups;
/// remote transports perform the same exchange over the network.
pub trait ShareSource {
    fn share(&self, x: u32, y: u32) -> Result<Vec<u8>>;
}

/// Secret key plus published params: everything a client needs
#[derive(Clone)]
pub struct PrivateContext {
    indexer: KeyedIndexer,
    params: Params,
}

impl std::fmt::Debug for PrivateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateContext")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PrivateContext {
    /// Bind a key to params, typically the ones published with a store
    pub fn new(key: &DictKey, params: Params) -> Result<Self> {
        params.validate()?;
        let indexer = KeyedIndexer::new(key, &params)?;
        Ok(Self { indexer, params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn evaluate(&self, input: &[u8]) -> Evaluation {
        self.indexer.evaluate(input)
    }

    /// Rows to request for `input`
    pub fn indices(&self, input: &[u8]) -> (u32, u32) {
        self.indexer.indices(input)
    }

    /// Interpret the provider's share for `input`
    ///
    /// `Ok(None)` means the input is not in the map. Absent inputs are
    /// reported as present with probability about `2^-(8 * tag_bytes)`.
    pub fn decode(&self, input: &[u8], share: &[u8]) -> Result<Option<Vec<u8>>> {
        let row_bytes = self.params.row_len();
        if share.len() != row_bytes {
            return Err(Error::ShareLength {
                expected: row_bytes,
                actual: share.len(),
            });
        }

        let mut candidate = share.to_vec();
        xor_into(&mut candidate, &self.indexer.pad(input));
        decode_row(&candidate, &self.params)
    }

    /// Full lookup against a share source
    pub fn get<S: ShareSource + ?Sized>(&self, source: &S, input: &[u8]) -> Result<Option<Vec<u8>>> {
        let (x, y) = self.indices(input);
        let share = source.share(x, y)?;
        self.decode(input, &share)
    }
}

/// Row contents an item's constraint must produce
///
/// `output`, then the marker byte when padding is enabled, then zeros
/// through the tag. Callers check that `output` fits.
pub(crate) fn encode_output(output: &[u8], params: &Params) -> Vec<u8> {
    let mut row = vec![0u8; params.row_len()];
    row[..output.len()].copy_from_slice(output);
    if params.pad_enabled {
        row[output.len()] = PAD_BYTE;
    }
    row
}

fn decode_row(candidate: &[u8], params: &Params) -> Result<Option<Vec<u8>>> {
    let body_len = params.max_output_len() + 1;
    let (body, tag) = candidate.split_at(candidate.len() - params.tag_len());
    if tag.iter().any(|&b| b != 0) {
        return Ok(None);
    }
    debug_assert_eq!(body.len(), body_len);

    if !params.pad_enabled {
        return Ok(Some(body[..params.max_output_len()].to_vec()));
    }

    match body.iter().rposition(|&b| b != 0) {
        Some(end) if body[end] == PAD_BYTE => Ok(Some(body[..end].to_vec())),
        _ => Err(Error::BadPadding),
    }
}
