// In-memory room table, write-through snapshotted to disk for restart
// recovery. The in-memory DashMap is authoritative while running; the
// snapshot file is a best-effort mirror, never consulted for scheduling
// decisions — the queues in memory are ground truth, the snapshot is not.
use dashmap::DashMap;
use hvac_protocol::{HvacError, HvacResult, RoomId, RoomState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::config::Config;
use crate::errors::CoreError;

#[derive(Clone)]
pub struct RoomStore {
    rooms: Arc<DashMap<RoomId, RoomState>>,
    snapshot_path: PathBuf,
}

impl RoomStore {
    /// Load rooms from the snapshot file if present; otherwise create
    /// `cfg.room_count`-worth of fresh rooms. A corrupt or unreadable
    /// snapshot is logged and treated as empty, not fatal.
    pub async fn load_or_init(cfg: &Config, room_count: usize, snapshot_path: PathBuf) -> Self {
        let rooms = match tokio::fs::read(&snapshot_path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<RoomState>>(&bytes) {
                Ok(rows) if !rows.is_empty() => {
                    let map = DashMap::new();
                    for r in rows {
                        map.insert(r.room_id.clone(), r);
                    }
                    map
                }
                Ok(_) => Self::fresh_rooms(cfg, room_count),
                Err(e) => {
                    warn!(error = %e, "room snapshot corrupt; reinitializing from config");
                    Self::fresh_rooms(cfg, room_count)
                }
            },
            Err(_) => Self::fresh_rooms(cfg, room_count),
        };

        Self {
            rooms: Arc::new(rooms),
            snapshot_path,
        }
    }

    fn fresh_rooms(cfg: &Config, room_count: usize) -> DashMap<RoomId, RoomState> {
        let map = DashMap::new();
        for i in 1..=room_count {
            let id = format!("{:03}", 100 + i);
            map.insert(id.clone(), RoomState::new(id, cfg.ambient));
        }
        map
    }

    pub fn rooms(&self) -> &DashMap<RoomId, RoomState> {
        &self.rooms
    }

    pub fn get(&self, room_id: &str) -> HvacResult<RoomState> {
        self.rooms
            .get(room_id)
            .map(|r| r.clone())
            .ok_or_else(|| HvacError::UnknownRoom(room_id.to_string()))
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    /// Write a snapshot of the current room table. Returns the underlying
    /// `CoreError` on failure rather than swallowing it: the periodic tick
    /// loops log-and-continue on this (§7's "storage transient failure"
    /// semantics — the next tick's attempt is an implicit retry), while an
    /// explicit caller (`HvacApi::snapshot_now`) can surface it instead.
    pub async fn snapshot(&self) -> Result<(), CoreError> {
        let rows: Vec<RoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let bytes = serde_json::to_vec_pretty(&rows)?;
        Self::write_atomic(&self.snapshot_path, &bytes).await?;
        Ok(())
    }

    /// Best-effort variant for the tick loops: log and swallow, never abort
    /// the caller's loop over a transient disk failure.
    pub async fn snapshot_best_effort(&self) {
        if let Err(e) = self.snapshot().await {
            warn!(error = %e, "room snapshot failed; will retry next tick");
        }
    }

    async fn write_atomic(path: &PathBuf, bytes: &[u8]) -> Result<(), CoreError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension("tmp");
        let mut f = tokio::fs::File::create(&tmp).await?;
        f.write_all(bytes).await?;
        f.flush().await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
