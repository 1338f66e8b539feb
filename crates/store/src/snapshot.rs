// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Snapshot registry for apply-time rollback.
//!
//! Each snapshot is one JSON file under the snapshot directory; the
//! in-memory list is ordered oldest-first and can be rebuilt from disk by
//! sorting filenames, which embed the capture timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::StoreError;

/// Snapshots kept after a successful prune.
pub const SNAPSHOT_RETENTION: usize = 10;

/// A captured kernel state used to roll back a failed apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub checkpoint_id: String,
    pub timestamp: DateTime<Utc>,
    pub kernel_state: Value,
    #[serde(default)]
    pub firewall_rules: String,
}

/// Listing entry: everything but the blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub checkpoint_id: String,
    pub timestamp: DateTime<Utc>,
}

/// On-disk snapshot store with an ordered in-memory index.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    // Oldest first
    index: RwLock<Vec<SnapshotMeta>>,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, index: RwLock::new(Vec::new()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, checkpoint_id: &str) -> PathBuf {
        self.dir.join(format!("{checkpoint_id}.json"))
    }

    /// Persist a snapshot and append it to the index.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        create_dir_0755(&self.dir)?;
        let path = self.path_for(&snapshot.checkpoint_id);
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Json { path: path.clone(), source: e })?;
        fs::write(&path, data).map_err(|e| StoreError::Io { path: path.clone(), source: e })?;
        set_mode_0600(&path)?;

        let mut index = self.index.write();
        index.retain(|meta| meta.checkpoint_id != snapshot.checkpoint_id);
        index.push(SnapshotMeta {
            checkpoint_id: snapshot.checkpoint_id.clone(),
            timestamp: snapshot.timestamp,
        });
        Ok(())
    }

    /// Load a snapshot by id; `"latest"` aliases the most recent one.
    pub fn load_snapshot(&self, checkpoint_id: &str) -> Result<Snapshot, StoreError> {
        let id = if checkpoint_id == "latest" {
            let index = self.index.read();
            index
                .last()
                .map(|meta| meta.checkpoint_id.clone())
                .ok_or_else(|| StoreError::CheckpointNotFound("latest".to_string()))?
        } else {
            checkpoint_id.to_string()
        };
        let path = self.path_for(&id);
        let data = fs::read(&path).map_err(|_| StoreError::CheckpointNotFound(id.clone()))?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Json { path, source: e })
    }

    /// Snapshot metadata, oldest first.
    pub fn list_snapshots(&self) -> Vec<SnapshotMeta> {
        self.index.read().clone()
    }

    /// Delete everything but the `keep` most recent snapshots.
    pub fn prune_old_snapshots(&self, keep: usize) -> Result<(), StoreError> {
        let pruned: Vec<SnapshotMeta> = {
            let mut index = self.index.write();
            if index.len() <= keep {
                return Ok(());
            }
            let cut = index.len() - keep;
            index.drain(..cut).collect()
        };
        for meta in pruned {
            let path = self.path_for(&meta.checkpoint_id);
            if let Err(e) = fs::remove_file(&path) {
                warn!(checkpoint = %meta.checkpoint_id, error = %e, "failed to prune snapshot");
            }
        }
        Ok(())
    }

    /// Rebuild the index from the snapshot directory. Filenames embed the
    /// capture timestamp, so sorting them restores chronological order.
    pub fn load_snapshots_from_disk(&self) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // A missing directory just means no snapshots yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::Io { path: self.dir.clone(), source: e }),
        };

        let mut metas = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable snapshot");
                    continue;
                }
            };
            match serde_json::from_slice::<Snapshot>(&data) {
                Ok(snapshot) => metas.push(SnapshotMeta {
                    checkpoint_id: snapshot.checkpoint_id,
                    timestamp: snapshot.timestamp,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping invalid snapshot"),
            }
        }
        metas.sort_by(|a, b| sort_key(&a.checkpoint_id).cmp(&sort_key(&b.checkpoint_id)));
        let count = metas.len();
        *self.index.write() = metas;
        Ok(count)
    }
}

/// Chronological sort key: the unix timestamp embedded after the last `-`,
/// with the full id as tie-breaker.
fn sort_key(checkpoint_id: &str) -> (u64, String) {
    let ts = checkpoint_id.rsplit('-').next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (ts, checkpoint_id.to_string())
}

fn create_dir_0755(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(dir)
            .map_err(|e| StoreError::Io { path: dir.to_path_buf(), source: e })
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir).map_err(|e| StoreError::Io { path: dir.to_path_buf(), source: e })
    }
}

fn set_mode_0600(path: &Path) -> Result<(), StoreError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::Io { path: path.to_path_buf(), source: e })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
