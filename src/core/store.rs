//! Scene persistence: one pretty-printed JSON array per store name.
//!
//! Layout inside the storage directory:
//! - `<name>`                               current catalog
//! - `<name>.tmp`                           write in progress (renamed over `<name>`)
//! - `backups/<name>.<yyyymmddThhmmss>.bak` snapshots taken by `backup()`
//!
//! All calls are issued from the loader thread only, so a `save` never races
//! a `load` of the same file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;

use crate::entities::Scene;
use crate::error::StoreError;

/// Subdirectory holding backup snapshots
pub const BACKUP_DIR: &str = "backups";

/// Durable storage for scene catalogs.
pub trait SceneStore: Send {
    /// Read catalog `name`. `Ok(None)` if it was never written.
    fn load(&self, name: &str) -> Result<Option<Vec<Scene>>, StoreError>;

    /// Write catalog `name`, replacing any previous content.
    fn save(&self, scenes: &[Scene], name: &str) -> Result<(), StoreError>;

    /// Snapshot catalog `name`. `Ok(None)` when there is nothing to copy yet.
    fn backup(&self, name: &str) -> Result<Option<PathBuf>, StoreError>;
}

/// File-backed store rooted at a dedicated directory
#[derive(Debug, Clone)]
pub struct JsonSceneStore {
    root: PathBuf,
}

impl JsonSceneStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
    }
}

impl SceneStore for JsonSceneStore {
    fn load(&self, name: &str) -> Result<Option<Vec<Scene>>, StoreError> {
        let path = self.path_for(name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No catalog at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let scenes: Vec<Scene> =
            serde_json::from_slice(&data).map_err(|source| StoreError::Decode { path: path.clone(), source })?;
        debug!("Read {} scenes from {}", scenes.len(), path.display());
        Ok(Some(scenes))
    }

    fn save(&self, scenes: &[Scene], name: &str) -> Result<(), StoreError> {
        Self::ensure_dir(&self.root)?;
        let json = serde_json::to_vec_pretty(scenes)?;

        let path = self.path_for(name);
        let tmp = self.path_for(&format!("{name}.tmp"));
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        debug!("Wrote {} scenes to {}", scenes.len(), path.display());
        Ok(())
    }

    fn backup(&self, name: &str) -> Result<Option<PathBuf>, StoreError> {
        let source = self.path_for(name);
        if !source.exists() {
            debug!("Nothing to back up at {}", source.display());
            return Ok(None);
        }

        let dir = self.root.join(BACKUP_DIR);
        Self::ensure_dir(&dir)?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let target = dir.join(format!("{name}.{stamp}.bak"));
        fs::copy(&source, &target).map_err(|e| StoreError::io(&target, e))?;

        debug!("Backed up {} -> {}", source.display(), target.display());
        Ok(Some(target))
    }
}
