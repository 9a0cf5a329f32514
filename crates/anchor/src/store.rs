//! Chain-state tracker
//!
//! Persists, per turn, the transaction identifier of that turn's anchor.
//! This is the only durable cross-epoch state the protocol owns: it is
//! read once per submission (previous turn) and written once, strictly
//! after the ledger accepts the transaction. Failed turns leave no
//! record and no compensating write.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::AnchorError;
use crate::types::AnchorRecord;

/// Minimal durable key/value capability, constructor-injected
pub trait KVStore: Send + Sync {
    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()>;
}

/// Durable store backed by sled
pub struct SledStore {
    // Keep the db handle alive alongside the tree
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(&path)?;
        let tree = db.open_tree("anchors")?;
        tracing::info!("opened anchor store at {:?}", path.as_ref());
        Ok(Self { _db: db, tree })
    }
}

impl KVStore for SledStore {
    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        self.tree.insert(key, value)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// In-memory store for tests and local tooling
#[derive(Default)]
pub struct MemStore {
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KVStore for MemStore {
    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// Turn-indexed anchor records over an injected [`KVStore`]
///
/// Keys are the turn's fixed-width big-endian encoding; values are
/// bincode-encoded [`AnchorRecord`]s.
pub struct AnchorStore {
    kv: Arc<dyn KVStore>,
}

impl AnchorStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    pub fn get(&self, turn: u64) -> Result<Option<AnchorRecord>, AnchorError> {
        let raw = self
            .kv
            .get(&turn.to_be_bytes())
            .map_err(|e| AnchorError::ChainState(format!("{e:#}")))?;
        match raw {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes)
                    .map_err(|e| AnchorError::ChainState(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn set(&self, turn: u64, record: &AnchorRecord) -> Result<(), AnchorError> {
        let bytes =
            bincode::serialize(record).map_err(|e| AnchorError::ChainState(e.to_string()))?;
        self.kv
            .set(&turn.to_be_bytes(), &bytes)
            .map_err(|e| AnchorError::ChainState(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l1_types::Digest;
    use tempfile::tempdir;

    fn record(tag: u8) -> AnchorRecord {
        AnchorRecord {
            tx_hash: Digest::new([tag; 32]),
            submitted_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempdir().unwrap();
        let store = AnchorStore::new(Arc::new(SledStore::open(dir.path()).unwrap()));

        assert!(store.get(0).unwrap().is_none());
        store.set(0, &record(0xa1)).unwrap();
        assert_eq!(store.get(0).unwrap().unwrap(), record(0xa1));
        assert!(store.get(1).unwrap().is_none());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = AnchorStore::new(Arc::new(SledStore::open(dir.path()).unwrap()));
            store.set(4, &record(0xb2)).unwrap();
        }
        let store = AnchorStore::new(Arc::new(SledStore::open(dir.path()).unwrap()));
        assert_eq!(store.get(4).unwrap().unwrap(), record(0xb2));
    }

    #[test]
    fn test_keys_are_big_endian_turns() {
        let mem = Arc::new(MemStore::new());
        let store = AnchorStore::new(mem.clone());
        store.set(0x0102, &record(1)).unwrap();

        let raw = mem
            .get(&[0, 0, 0, 0, 0, 0, 0x01, 0x02])
            .unwrap()
            .expect("record stored under big-endian key");
        let decoded: AnchorRecord = bincode::deserialize(&raw).unwrap();
        assert_eq!(decoded, record(1));
    }
}
