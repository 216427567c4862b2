//! Pluggable snapshot persistence for the in-memory backend.
//!
//! The state serializes as a UTF-8 JSON array of per-room records. A missing
//! file loads as empty state, so first boot needs no provisioning.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::state::RoomSnapshot;

/// Save/load callbacks the store runs on its snapshot cadence.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> io::Result<Vec<RoomSnapshot>>;
    async fn save(&self, rooms: &[RoomSnapshot]) -> io::Result<()>;
}

/// Snapshot file on the local filesystem.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> io::Result<Vec<RoomSnapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no snapshot file, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let rooms: Vec<RoomSnapshot> = serde_json::from_slice(&bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        tracing::info!(
            path = %self.path.display(),
            rooms = rooms.len(),
            "snapshot loaded"
        );
        Ok(rooms)
    }

    async fn save(&self, rooms: &[RoomSnapshot]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(rooms)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        // Write-then-rename so a crash mid-save never truncates the snapshot.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            rooms = rooms.len(),
            bytes = bytes.len(),
            "snapshot saved"
        );
        Ok(())
    }
}
