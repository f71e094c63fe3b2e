//! Persistent element-tree snapshots for the `snapshot`/`diff` commands.
//!
//! Uses LMDB (via heed). Snapshots are stored as JSON keyed by the source
//! path, with the sha256 of the source next to them so unchanged files can
//! be recognized without rebuilding anything.

use anyhow::{Context, Result};
use heed::types::Str;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, RoTxn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::delta_builder::SnapshotRecord;

pub const SNAPSHOTS_DB: &str = "snapshots";
pub const HASHES_DB: &str = "hashes";

const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;
const DEFAULT_MAX_DBS: u32 = 32;

type StrDb = Database<Str, Str>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub content_hash: String,
    pub recorded_at: u64,
    pub record: SnapshotRecord,
}

#[derive(Debug)]
pub struct SnapshotStore {
    env: Arc<Env>,
    db_path: PathBuf,
    snapshots: StrDb,
    hashes: StrDb,
}

impl SnapshotStore {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create snapshot directory: {}", parent.display())
            })?;
        }

        let env = Arc::new(open_env(&db_path)?);
        let mut wtxn = env.write_txn()?;
        let snapshots = env.create_database::<Str, Str>(&mut wtxn, Some(SNAPSHOTS_DB))?;
        let hashes = env.create_database::<Str, Str>(&mut wtxn, Some(HASHES_DB))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            db_path,
            snapshots,
            hashes,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn get(&self, key: &str) -> Result<Option<StoredSnapshot>> {
        let rtxn = self.env.read_txn()?;
        let Some(json) = self.snapshots.get(&rtxn, key)? else {
            return Ok(None);
        };
        let stored = serde_json::from_str(json)
            .with_context(|| format!("Corrupt snapshot for {key}"))?;
        Ok(Some(stored))
    }

    pub fn content_hash(&self, key: &str) -> Result<Option<String>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.hashes.get(&rtxn, key)?.map(str::to_string))
    }

    pub fn put(&self, key: &str, snapshot: &StoredSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        let mut wtxn = self.env.write_txn()?;
        self.snapshots.put(&mut wtxn, key, &json)?;
        self.hashes.put(&mut wtxn, key, &snapshot.content_hash)?;
        wtxn.commit()?;
        debug!(target: "jmodel.delta", key, nodes = snapshot.record.nodes.len(), "snapshot stored");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let removed = self.snapshots.delete(&mut wtxn, key)?;
        self.hashes.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(removed)
    }

    pub fn stats(&self) -> Result<SnapshotStats> {
        let rtxn = self.env.read_txn()?;
        let mut snapshots = 0u64;
        let mut total_nodes = 0u64;
        let mut newest: Option<String> = None;
        let mut newest_at = 0u64;
        for item in self.snapshots.iter(&rtxn)? {
            let (key, json) = item?;
            snapshots += 1;
            let Ok(stored) = serde_json::from_str::<StoredSnapshot>(json) else {
                continue;
            };
            total_nodes += stored.record.nodes.len() as u64;
            if newest.is_none() || stored.recorded_at > newest_at {
                newest_at = stored.recorded_at;
                newest = Some(key.to_string());
            }
        }
        Ok(SnapshotStats {
            db_path: self.db_path.to_string_lossy().to_string(),
            snapshots,
            hashes: table_len(&self.hashes, &rtxn)?,
            total_nodes,
            newest,
        })
    }
}

fn open_env(db_path: &Path) -> Result<Env> {
    let mut options = EnvOpenOptions::new();
    options.map_size(DEFAULT_MAP_SIZE);
    options.max_dbs(DEFAULT_MAX_DBS);
    // SAFETY: We do not use NO_LOCK and keep default LMDB locking guarantees.
    // NO_SUB_DIR keeps the database a single file at the --db path.
    unsafe {
        options.flags(EnvFlags::NO_SUB_DIR);
        options
            .open(db_path)
            .with_context(|| format!("Failed to create/open db env: {}", db_path.display()))
    }
}

fn table_len(db: &StrDb, rtxn: &RoTxn<'_>) -> Result<u64> {
    let mut count = 0u64;
    for item in db.iter(rtxn)? {
        let _ = item?;
        count += 1;
    }
    Ok(count)
}

#[derive(Debug, Serialize)]
pub struct SnapshotStats {
    pub db_path: String,
    pub snapshots: u64,
    pub hashes: u64,
    pub total_nodes: u64,
    pub newest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta_builder::SnapshotNode;
    use crate::info::InfoDetail;

    fn stored(hash: &str, at: u64) -> StoredSnapshot {
        StoredSnapshot {
            content_hash: hash.to_string(),
            recorded_at: at,
            record: SnapshotRecord {
                root: "=P/src<p{X.java".to_string(),
                nodes: vec![SnapshotNode {
                    element: "=P/src<p{X.java".to_string(),
                    detail: InfoDetail::PackageDeclaration,
                    children: Vec::new(),
                }],
            },
        }
    }

    #[test]
    fn put_get_remove_and_stats() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SnapshotStore::open(dir.path().join("nested/snapshots.lmdb"))?;
        assert!(store.get("/a/X.java")?.is_none());

        store.put("/a/X.java", &stored("aa", 1))?;
        store.put("/a/Y.java", &stored("bb", 5))?;
        assert_eq!(store.get("/a/X.java")?, Some(stored("aa", 1)));
        assert_eq!(store.content_hash("/a/Y.java")?.as_deref(), Some("bb"));

        let stats = store.stats()?;
        assert_eq!(stats.snapshots, 2);
        assert_eq!(stats.hashes, 2);
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.newest.as_deref(), Some("/a/Y.java"));

        assert!(store.remove("/a/X.java")?);
        assert!(!store.remove("/a/X.java")?);
        assert!(store.content_hash("/a/X.java")?.is_none());
        Ok(())
    }
}
