//! Scene loader: cache-first catalog loading on a dedicated thread.
//!
//! **Why a thread**: file I/O must never stall the playback state machine.
//! The loader owns the [`SceneStore`] and processes requests from its
//! mailbox strictly in order, so store reads and writes never interleave.
//!
//! # Load path
//!
//! 1. Catalog key in [`GenericCache`] -> return it, no I/O
//! 2. Store has the file -> validate every scene, cache, return
//! 3. Store has no file -> write the seed catalog, cache, return
//!
//! Any storage failure comes back as [`ContentError::SceneLoadFailed`].
//!
//! # Handles
//!
//! Every request returns a [`Pending`] immediately. Dropping it does not
//! cancel anything: the loader still finishes and populates the cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, info, trace, warn};

use crate::core::cache::GenericCache;
use crate::core::store::SceneStore;
use crate::entities::{Scene, default_catalog};
use crate::error::{ContentError, StoreError};

/// Default catalog file / cache key
pub const CATALOG_KEY: &str = "scenes.json";

/// Cache type shared between the loader and its owner
pub type CatalogCache = GenericCache<String, Vec<Scene>>;

type Reply<T> = Sender<Result<T, ContentError>>;

enum LoaderCommand {
    Load(Reply<Vec<Scene>>),
    Migrate(Reply<usize>),
    Backup(Reply<Option<PathBuf>>),
    Shutdown,
}

/// Result of a request still being processed by the loader.
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<Result<T, ContentError>>,
}

impl<T> Pending<T> {
    /// Block until the loader answers.
    pub fn wait(self) -> Result<T, ContentError> {
        self.rx.recv().unwrap_or_else(|_| Err(StoreError::Unavailable.into()))
    }

    /// Non-blocking check. `None` while the request is in flight.
    pub fn try_take(&self) -> Option<Result<T, ContentError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(StoreError::Unavailable.into())),
        }
    }
}

/// Handle to the loader thread.
pub struct SceneLoader {
    tx: Sender<LoaderCommand>,
    handle: Option<thread::JoinHandle<()>>,
    cache: Arc<CatalogCache>,
}

impl SceneLoader {
    /// Spawn the loader thread. It owns `store`; `cache` stays shared.
    pub fn spawn(store: Box<dyn SceneStore>, cache: Arc<CatalogCache>, catalog_key: impl Into<String>) -> Self {
        let (tx, rx) = unbounded::<LoaderCommand>();
        let mut worker = LoaderWorker {
            store,
            cache: Arc::clone(&cache),
            key: catalog_key.into(),
        };

        let handle = thread::Builder::new()
            .name("lull-loader".to_string())
            .spawn(move || {
                trace!("Loader started (key={})", worker.key);
                for cmd in rx.iter() {
                    match cmd {
                        LoaderCommand::Load(reply) => {
                            let _ = reply.send(worker.load_scenes());
                        }
                        LoaderCommand::Migrate(reply) => {
                            let _ = reply.send(worker.migrate());
                        }
                        LoaderCommand::Backup(reply) => {
                            let _ = reply.send(Ok(worker.backup()));
                        }
                        LoaderCommand::Shutdown => break,
                    }
                }
                trace!("Loader stopped");
            })
            .expect("Failed to spawn loader thread");

        Self {
            tx,
            handle: Some(handle),
            cache,
        }
    }

    /// Load the validated catalog (cache, then store, then seed).
    pub fn load_scenes(&self) -> Pending<Vec<Scene>> {
        self.request(LoaderCommand::Load)
    }

    /// Reload from storage, rewrite in the current shape, drop the cached copy.
    /// Resolves to the number of scenes rewritten.
    pub fn migrate(&self) -> Pending<usize> {
        self.request(LoaderCommand::Migrate)
    }

    /// Snapshot the catalog file. Failures are logged and resolve to `None`.
    pub fn backup(&self) -> Pending<Option<PathBuf>> {
        self.request(LoaderCommand::Backup)
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> LoaderCommand) -> Pending<T> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        // On a dead loader the reply sender is dropped here and wait() reports Unavailable
        if self.tx.send(make(reply)).is_err() {
            warn!("Scene loader is not running");
        }
        Pending { rx }
    }
}

impl Drop for SceneLoader {
    fn drop(&mut self) {
        let _ = self.tx.send(LoaderCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Loader state living on the loader thread.
struct LoaderWorker {
    store: Box<dyn SceneStore>,
    cache: Arc<CatalogCache>,
    key: String,
}

impl LoaderWorker {
    fn load_scenes(&mut self) -> Result<Vec<Scene>, ContentError> {
        if let Some(scenes) = self.cache.value(&self.key) {
            trace!("Catalog served from cache ({} scenes)", scenes.len());
            return Ok(scenes);
        }

        let scenes = match self.load_validated()? {
            Some(scenes) => scenes,
            None => {
                let seed = default_catalog();
                self.store.save(&seed, &self.key)?;
                info!("Seeded catalog '{}' with {} scenes", self.key, seed.len());
                seed
            }
        };

        self.cache.insert(scenes.clone(), self.key.clone());
        info!("Loaded {} scenes from '{}'", scenes.len(), self.key);
        Ok(scenes)
    }

    /// Store read with all-or-nothing validation. Never touches the cache.
    fn load_validated(&mut self) -> Result<Option<Vec<Scene>>, ContentError> {
        let Some(scenes) = self.store.load(&self.key)? else {
            return Ok(None);
        };
        for scene in &scenes {
            scene.validate()?;
        }
        Ok(Some(scenes))
    }

    fn migrate(&mut self) -> Result<usize, ContentError> {
        let count = match self.load_validated()? {
            Some(scenes) => {
                self.store.save(&scenes, &self.key)?;
                scenes.len()
            }
            None => {
                debug!("Nothing to migrate for '{}'", self.key);
                0
            }
        };
        self.cache.remove_value(&self.key);
        info!("Migrated catalog '{}' ({} scenes), cache invalidated", self.key, count);
        Ok(count)
    }

    fn backup(&mut self) -> Option<PathBuf> {
        match self.store.backup(&self.key) {
            Ok(path) => path,
            Err(e) => {
                warn!("Backup of '{}' failed: {}", self.key, e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::store::JsonSceneStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store wrapper counting `load` calls.
    pub(crate) struct CountingStore<S> {
        pub inner: S,
        pub loads: Arc<AtomicUsize>,
    }

    impl<S: SceneStore> SceneStore for CountingStore<S> {
        fn load(&self, name: &str) -> Result<Option<Vec<Scene>>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(name)
        }

        fn save(&self, scenes: &[Scene], name: &str) -> Result<(), StoreError> {
            self.inner.save(scenes, name)
        }

        fn backup(&self, name: &str) -> Result<Option<PathBuf>, StoreError> {
            self.inner.backup(name)
        }
    }

    /// Loader over a counting JSON store in `dir`.
    pub(crate) fn counting_loader(dir: &std::path::Path) -> (SceneLoader, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: JsonSceneStore::new(dir),
            loads: Arc::clone(&loads),
        };
        let cache = Arc::new(CatalogCache::new(8));
        (SceneLoader::spawn(Box::new(store), cache, CATALOG_KEY), loads)
    }

    #[test]
    fn test_first_load_synthesizes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = counting_loader(dir.path());

        let scenes = loader.load_scenes().wait().unwrap();
        assert_eq!(scenes.len(), 6);
        assert!(scenes.iter().all(|s| s.is_active));

        let on_disk = JsonSceneStore::new(dir.path()).load(CATALOG_KEY).unwrap().unwrap();
        assert_eq!(on_disk, scenes);
    }

    #[test]
    fn test_second_load_is_cache_served() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, loads) = counting_loader(dir.path());

        let first = loader.load_scenes().wait().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let second = loader.load_scenes().wait().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_migrate_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, loads) = counting_loader(dir.path());

        loader.load_scenes().wait().unwrap();
        assert_eq!(loader.migrate().wait().unwrap(), 6);
        assert!(!loader.cache().contains(&CATALOG_KEY.to_string()));
        let after_migrate = loads.load(Ordering::SeqCst);

        loader.load_scenes().wait().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), after_migrate + 1);
    }

    #[test]
    fn test_migrate_rewrites_legacy_document() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = r#"[{"id":"6f1c1d7e-8a53-4f7b-9d43-1f0a5b2c9e11","name":"Old Rain","type":"rain","duration":60}]"#;
        std::fs::write(dir.path().join(CATALOG_KEY), legacy).unwrap();
        let (loader, _) = counting_loader(dir.path());

        assert_eq!(loader.migrate().wait().unwrap(), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(CATALOG_KEY)).unwrap()).unwrap();
        assert_eq!(raw[0]["isActive"], true);
        assert_eq!(raw[0]["metadata"]["author"], "unknown");
    }

    #[test]
    fn test_invalid_scene_aborts_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = default_catalog();
        catalog[3].duration = Duration::ZERO;
        JsonSceneStore::new(dir.path()).save(&catalog, CATALOG_KEY).unwrap();

        let (loader, _) = counting_loader(dir.path());
        let err = loader.load_scenes().wait().unwrap_err();
        assert!(matches!(err, ContentError::InvalidSceneData(_)));
        assert!(loader.cache().is_empty());
    }

    #[test]
    fn test_corrupt_file_wrapped_as_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CATALOG_KEY), "[{").unwrap();

        let (loader, _) = counting_loader(dir.path());
        let err = loader.load_scenes().wait().unwrap_err();
        assert!(matches!(err, ContentError::SceneLoadFailed(_)));
    }

    #[test]
    fn test_backup_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = counting_loader(dir.path());

        // Nothing persisted yet
        assert_eq!(loader.backup().wait().unwrap(), None);

        loader.load_scenes().wait().unwrap();
        let path = loader.backup().wait().unwrap();
        assert!(path.is_some_and(|p| p.exists()));
    }

    #[test]
    fn test_dropped_handle_still_populates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = counting_loader(dir.path());

        drop(loader.load_scenes());
        // Requests are processed in order, so this one completes after the abandoned load
        loader.backup().wait().unwrap();
        assert!(loader.cache().contains(&CATALOG_KEY.to_string()));
    }
}
