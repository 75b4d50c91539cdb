//! Store construction
//!
//! Checks the map, sizes the table, then draws salts until the construction
//! graph peels completely. Attempts are independent, so with more than one
//! worker several salts are tried at once and the first success wins.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::RngCore;

use crate::config::StoreConfig;
use crate::context::{encode_output, PrivateContext};
use crate::error::{ConfigError, Error};
use crate::graph::{assign, ConstructionGraph, PeelError};
use crate::indexer::{Evaluation, KeyedIndexer};
use crate::keys::DictKey;
use crate::params::Params;
use crate::store::PublicStore;
use crate::table::CompressedTable;
use crate::Result;

/// Rows for `items` entries at `factor` rows per entry, at least 2
pub fn compute_table_length(items: usize, factor: f64) -> u32 {
    let raw = factor * items as f64;
    // Products like 2.09 * 100 can land a hair above the integer.
    let rows = (raw - raw * f64::EPSILON).ceil();
    (rows as u32).max(2)
}

/// Build a store for `items`
///
/// Returns the client's context and the public artifact. Fails up front on
/// an empty map, duplicate inputs, or outputs that do not fit a row, and
/// with [`Error::ConstructionFailed`] once `config.max_attempts` salts have
/// been tried.
pub fn build_store<I, K, V>(
    key: &DictKey,
    items: I,
    config: &StoreConfig,
) -> Result<(PrivateContext, PublicStore)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let items: Vec<(Vec<u8>, Vec<u8>)> = items
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_vec(), v.as_ref().to_vec()))
        .collect();
    let job = Job::prepare(&items, config)?;

    let (params, compressed) = if config.workers > 1 {
        run_parallel(key, &job, config)?
    } else {
        run_sequential(key, &job, config)?
    };

    tracing::debug!(
        items = items.len(),
        table_length = params.table_length,
        occupied = compressed.len(),
        row_bytes = params.row_bytes,
        "store built"
    );

    let context = PrivateContext::new(key, params.clone())?;
    Ok((context, PublicStore::new(params, compressed)?))
}

/// Validated inputs shared by every attempt
struct Job<'a> {
    inputs: Vec<&'a [u8]>,
    targets: Vec<Vec<u8>>,
    /// Salt left empty; each attempt fills its own
    params: Params,
    salt_bytes: usize,
}

impl<'a> Job<'a> {
    fn prepare(items: &'a [(Vec<u8>, Vec<u8>)], config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        if items.is_empty() {
            return Err(ConfigError::EmptyMap.into());
        }

        let max_output = items.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let table_length = compute_table_length(items.len(), config.table_factor);
        let params = Params::new(
            table_length,
            max_output,
            config.tag_bytes,
            config.pad_enabled,
        )?;

        let mut seen = HashSet::with_capacity(items.len());
        for (input, output) in items {
            if !seen.insert(input.as_slice()) {
                return Err(ConfigError::DuplicateInput.into());
            }
            if !config.pad_enabled && output.len() != max_output {
                return Err(ConfigError::UnevenOutputs {
                    expected: max_output,
                    actual: output.len(),
                }
                .into());
            }
        }

        Ok(Self {
            inputs: items.iter().map(|(k, _)| k.as_slice()).collect(),
            targets: items
                .iter()
                .map(|(_, v)| encode_output(v, &params))
                .collect(),
            params,
            salt_bytes: config.salt_bytes,
        })
    }

    /// One construction attempt under a fresh salt
    fn attempt(&self, key: &DictKey) -> Result<std::result::Result<(Params, CompressedTable), PeelError>> {
        let mut params = self.params.clone();
        params.salt = vec![0u8; self.salt_bytes];
        rand::thread_rng().fill_bytes(&mut params.salt);

        let indexer = KeyedIndexer::new(key, &params)?;
        let evals: Vec<Evaluation> = self.inputs.iter().map(|i| indexer.evaluate(i)).collect();

        let mut graph = ConstructionGraph::with_capacity(params.table_length, evals.len());
        for eval in &evals {
            graph.add_edge(eval.x, eval.y);
        }

        let order = match graph.peel() {
            Ok(order) => order,
            Err(e) => return Ok(Err(e)),
        };
        let table = assign(
            &order,
            &evals,
            &self.targets,
            params.table_length,
            params.row_len(),
        );
        Ok(Ok((params, CompressedTable::compress(&table))))
    }
}

fn run_sequential(
    key: &DictKey,
    job: &Job<'_>,
    config: &StoreConfig,
) -> Result<(Params, CompressedTable)> {
    for attempt in 1..=config.max_attempts {
        match job.attempt(key)? {
            Ok(built) => return Ok(built),
            Err(e) => tracing::debug!(attempt, error = %e, "retrying with fresh salt"),
        }
    }
    tracing::warn!(attempts = config.max_attempts, "construction gave up");
    Err(Error::ConstructionFailed {
        attempts: config.max_attempts,
    })
}

fn run_parallel(
    key: &DictKey,
    job: &Job<'_>,
    config: &StoreConfig,
) -> Result<(Params, CompressedTable)> {
    let next_attempt = AtomicUsize::new(1);
    let done = AtomicBool::new(false);
    let outcome: Mutex<Option<Result<(Params, CompressedTable)>>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for worker in 0..config.workers {
            let next_attempt = &next_attempt;
            let done = &done;
            let outcome = &outcome;
            scope.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let attempt = next_attempt.fetch_add(1, Ordering::Relaxed);
                    if attempt > config.max_attempts {
                        break;
                    }
                    let result = match job.attempt(key) {
                        Ok(Err(e)) => {
                            tracing::debug!(worker, attempt, error = %e, "retrying with fresh salt");
                            continue;
                        }
                        Ok(Ok(built)) => Ok(built),
                        Err(e) => Err(e),
                    };
                    if !done.swap(true, Ordering::AcqRel) {
                        if let Ok(mut slot) = outcome.lock() {
                            *slot = Some(result);
                        }
                    }
                    break;
                }
            });
        }
    });

    let outcome = outcome.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    outcome.unwrap_or_else(|| {
        tracing::warn!(attempts = config.max_attempts, "construction gave up");
        Err(Error::ConstructionFailed {
            attempts: config.max_attempts,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PAD_BYTE;

    fn key() -> DictKey {
        DictKey::new(*b"1234123412341234")
    }

    fn sample() -> Vec<(&'static [u8], &'static [u8])> {
        vec![
            (b"hip".as_slice(), b"pizza".as_slice()),
            (b"is".as_slice(), b"like".as_slice()),
            (b"this".as_slice(), b"I".as_slice()),
            (b"pretty\0cool".as_slice(), b"".as_slice()),
        ]
    }

    #[test]
    fn test_table_length() {
        assert_eq!(compute_table_length(4, 2.09), 9);
        assert_eq!(compute_table_length(100, 2.09), 209);
        assert_eq!(compute_table_length(1, 2.09), 3);
        assert_eq!(compute_table_length(0, 2.09), 2);
    }

    #[test]
    fn test_build_sample() {
        let (context, store) = build_store(&key(), sample(), &StoreConfig::default()).unwrap();
        assert_eq!(store.params().table_length, 9);
        assert_eq!(store.params().max_output_bytes, 5);
        assert_eq!(store.params().row_bytes, 9);
        assert_eq!(store.params().salt.len(), 8);
        assert_eq!(context.params(), store.params());
    }

    #[test]
    fn test_every_constraint_holds() {
        let (context, store) = build_store(&key(), sample(), &StoreConfig::default()).unwrap();
        let params = store.params();
        let table = store
            .table()
            .decompress(params.table_length, params.row_len())
            .unwrap();

        for (input, output) in sample() {
            let eval = context.evaluate(input);
            let mut row = table.row(eval.x).to_vec();
            crate::table::xor_into(&mut row, table.row(eval.y));
            crate::table::xor_into(&mut row, &eval.pad);

            assert_eq!(&row[..output.len()], output);
            assert_eq!(row[output.len()], PAD_BYTE);
            assert!(row[output.len() + 1..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_empty_map() {
        let items: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        let err = build_store(&key(), items, &StoreConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EmptyMap)));
    }

    #[test]
    fn test_output_too_long() {
        let long = vec![0u8; 64 - 3];
        let err = build_store(&key(), [(b"cool".to_vec(), long)], &StoreConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::OutputTooLong { len: 61, max: 60 })
        ));
    }

    #[test]
    fn test_duplicate_input() {
        let items = [(b"a".as_slice(), b"1".as_slice()), (b"a".as_slice(), b"2".as_slice())];
        let err = build_store(&key(), items, &StoreConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::DuplicateInput)));
    }

    #[test]
    fn test_unpadded_requires_even_outputs() {
        let items = [(b"a".as_slice(), b"12".as_slice()), (b"b".as_slice(), b"1".as_slice())];
        let err = build_store(&key(), items, &StoreConfig::unpadded()).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnevenOutputs { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = StoreConfig {
            tag_bytes: 0,
            ..StoreConfig::default()
        };
        let err = build_store(&key(), sample(), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidParam { field: "tag_bytes", .. })
        ));
    }

    #[test]
    fn test_gives_up_when_table_cannot_peel() {
        // 100 edges on 101 rows: the graph is a tree with negligible probability.
        let config = StoreConfig {
            table_factor: 1.01,
            max_attempts: 5,
            ..StoreConfig::default()
        };
        let items: Vec<(String, String)> =
            (0..100).map(|i| (i.to_string(), i.to_string())).collect();
        let err = build_store(&key(), items, &config).unwrap_err();
        assert!(matches!(err, Error::ConstructionFailed { attempts: 5 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parallel_workers() {
        let config = StoreConfig {
            workers: 4,
            ..StoreConfig::default()
        };
        let items: Vec<(String, String)> = (0..500)
            .map(|i| (format!("key-{}", i), format!("value-{}", i)))
            .collect();
        let (context, store) = build_store(&key(), items.clone(), &config).unwrap();
        for (input, output) in items.iter().take(50) {
            let found = context.get(&store, input.as_bytes()).unwrap();
            assert_eq!(found.as_deref(), Some(output.as_bytes()));
        }
    }

    #[test]
    fn test_parallel_gives_up() {
        let config = StoreConfig {
            table_factor: 1.01,
            max_attempts: 8,
            workers: 3,
            ..StoreConfig::default()
        };
        let items: Vec<(String, String)> =
            (0..100).map(|i| (i.to_string(), i.to_string())).collect();
        let err = build_store(&key(), items, &config).unwrap_err();
        assert!(matches!(err, Error::ConstructionFailed { attempts: 8 }));
    }
}
