//! Per-chain gas price and gas factor storage
//!
//! Stores map a case-sensitive chain name to a gas price (fee token per unit
//! gas) and a gas factor (multiplier applied to simulated gas). A missing key
//! is a typed error, never a silent zero. The file-backed variant mirrors the
//! in-memory view to a JSON snapshot after every write.

use crate::error::{RelayError, RelayResult};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// File name of the persistent snapshot inside the data directory
const SNAPSHOT_FILE: &str = "gas_prices.json";

/// Simple KV store for per-chain gas pricing
pub trait GasPriceStore: Send + Sync {
    fn has_gas_price(&self, chain_name: &str) -> RelayResult<bool>;
    fn gas_price(&self, chain_name: &str) -> RelayResult<f64>;
    fn set_gas_price(&self, chain_name: &str, gas_price: f64) -> RelayResult<()>;

    fn has_gas_factor(&self, chain_name: &str) -> RelayResult<bool>;
    fn gas_factor(&self, chain_name: &str) -> RelayResult<f64>;
    fn set_gas_factor(&self, chain_name: &str, gas_factor: f64) -> RelayResult<()>;
}

fn reject_negative(what: &str, value: f64) -> RelayResult<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(RelayError::InvalidParameter(format!(
            "{what} must be a non-negative finite number, got {value}"
        )));
    }
    Ok(())
}

/// In-memory gas pricing store
#[derive(Default)]
pub struct InMemoryGasPriceStore {
    prices: DashMap<String, f64>,
    factors: DashMap<String, f64>,
}

impl InMemoryGasPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GasPriceStore for InMemoryGasPriceStore {
    fn has_gas_price(&self, chain_name: &str) -> RelayResult<bool> {
        Ok(self.prices.contains_key(chain_name))
    }

    fn gas_price(&self, chain_name: &str) -> RelayResult<f64> {
        self.prices
            .get(chain_name)
            .map(|entry| *entry)
            .ok_or(RelayError::NoGasPrice)
    }

    fn set_gas_price(&self, chain_name: &str, gas_price: f64) -> RelayResult<()> {
        reject_negative("gas price", gas_price)?;
        self.prices.insert(chain_name.to_string(), gas_price);
        Ok(())
    }

    fn has_gas_factor(&self, chain_name: &str) -> RelayResult<bool> {
        Ok(self.factors.contains_key(chain_name))
    }

    fn gas_factor(&self, chain_name: &str) -> RelayResult<f64> {
        self.factors
            .get(chain_name)
            .map(|entry| *entry)
            .ok_or(RelayError::NoGasFactor)
    }

    fn set_gas_factor(&self, chain_name: &str, gas_factor: f64) -> RelayResult<()> {
        reject_negative("gas factor", gas_factor)?;
        self.factors.insert(chain_name.to_string(), gas_factor);
        Ok(())
    }
}

/// On-disk shape of the snapshot file
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    gas_prices: BTreeMap<String, f64>,
    #[serde(default)]
    gas_factors: BTreeMap<String, f64>,
}

/// File-backed gas pricing store.
///
/// Wraps an [`InMemoryGasPriceStore`] and rewrites the full snapshot after
/// every successful set, so the on-disk and in-memory views are identical the
/// moment a set returns. The update+persist pair runs under one mutex to keep
/// on-disk state from interleaving between concurrent writers.
pub struct FileBackedGasPriceStore {
    memory: InMemoryGasPriceStore,
    path: PathBuf,
    persist_lock: Mutex<()>,
}

impl FileBackedGasPriceStore {
    /// Open the store, pre-populating from `<data_dir>/gas_prices.json` when
    /// the file exists. A missing file is not an error; the directory is
    /// created if needed.
    pub fn new(data_dir: &Path) -> RelayResult<Self> {
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(SNAPSHOT_FILE);
        let memory = InMemoryGasPriceStore::new();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&contents)?;
            for (chain_name, price) in snapshot.gas_prices {
                memory.set_gas_price(&chain_name, price)?;
            }
            for (chain_name, factor) in snapshot.gas_factors {
                memory.set_gas_factor(&chain_name, factor)?;
            }
            debug!("loaded gas snapshot from {}", path.display());
        }

        Ok(Self {
            memory,
            path,
            persist_lock: Mutex::new(()),
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> RelayResult<()> {
        let snapshot = Snapshot {
            gas_prices: self
                .memory
                .prices
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            gas_factors: self
                .memory
                .factors
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        snapshot.serialize(&mut serializer)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(&buf)?;

        Ok(())
    }
}

impl GasPriceStore for FileBackedGasPriceStore {
    fn has_gas_price(&self, chain_name: &str) -> RelayResult<bool> {
        self.memory.has_gas_price(chain_name)
    }

    fn gas_price(&self, chain_name: &str) -> RelayResult<f64> {
        self.memory.gas_price(chain_name)
    }

    fn set_gas_price(&self, chain_name: &str, gas_price: f64) -> RelayResult<()> {
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.memory.set_gas_price(chain_name, gas_price)?;
        self.persist()
    }

    fn has_gas_factor(&self, chain_name: &str) -> RelayResult<bool> {
        self.memory.has_gas_factor(chain_name)
    }

    fn gas_factor(&self, chain_name: &str) -> RelayResult<f64> {
        self.memory.gas_factor(chain_name)
    }

    fn set_gas_factor(&self, chain_name: &str, gas_factor: f64) -> RelayResult<()> {
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.memory.set_gas_factor(chain_name, gas_factor)?;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_are_typed_errors() {
        let store = InMemoryGasPriceStore::new();
        assert!(!store.has_gas_price("osmosis").unwrap());
        assert!(matches!(
            store.gas_price("osmosis"),
            Err(RelayError::NoGasPrice)
        ));
        assert!(matches!(
            store.gas_factor("osmosis"),
            Err(RelayError::NoGasFactor)
        ));
    }

    #[test]
    fn test_set_and_get() {
        let store = InMemoryGasPriceStore::new();
        store.set_gas_price("osmosis", 0.025).unwrap();
        store.set_gas_factor("osmosis", 1.3).unwrap();

        assert!(store.has_gas_price("osmosis").unwrap());
        assert!(store.has_gas_factor("osmosis").unwrap());
        assert_eq!(store.gas_price("osmosis").unwrap(), 0.025);
        assert_eq!(store.gas_factor("osmosis").unwrap(), 1.3);

        // Chain names are case sensitive
        assert!(!store.has_gas_price("Osmosis").unwrap());
    }

    #[test]
    fn test_negative_values_rejected() {
        let store = InMemoryGasPriceStore::new();
        assert!(matches!(
            store.set_gas_price("osmosis", -0.1),
            Err(RelayError::InvalidParameter(_))
        ));
        assert!(matches!(
            store.set_gas_factor("osmosis", -1.0),
            Err(RelayError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = FileBackedGasPriceStore::new(dir.path()).unwrap();
            store.set_gas_price("osmosis", 0.025).unwrap();
            store.set_gas_factor("osmosis", 1.3).unwrap();
            store.set_gas_price("juno", 0.075).unwrap();
            store.set_gas_factor("juno", 1.5).unwrap();
        }

        let reloaded = FileBackedGasPriceStore::new(dir.path()).unwrap();
        assert_eq!(reloaded.gas_price("osmosis").unwrap(), 0.025);
        assert_eq!(reloaded.gas_factor("osmosis").unwrap(), 1.3);
        assert_eq!(reloaded.gas_price("juno").unwrap(), 0.075);
        assert_eq!(reloaded.gas_factor("juno").unwrap(), 1.5);
    }

    #[test]
    fn test_snapshot_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedGasPriceStore::new(dir.path()).unwrap();
        store.set_gas_price("osmosis", 0.025).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["gas_prices"]["osmosis"], 0.025);
        assert!(parsed["gas_factors"].as_object().unwrap().is_empty());

        // Pretty-printed with four-space indentation
        assert!(contents.contains("    \"gas_prices\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedGasPriceStore::new(dir.path()).unwrap();
        store.set_gas_price("osmosis", 0.025).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedGasPriceStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.gas_price("osmosis"),
            Err(RelayError::NoGasPrice)
        ));
    }
}
