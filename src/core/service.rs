//! Content service: catalog, playback state machine, recommendation, scheduling.
//!
//! **Architecture**: the service exclusively owns the published state
//! (available scenes, current scene, playing flag, last error). All mutation
//! goes through `&mut self`, so the owner's thread is the single serialized
//! context for transitions. Storage work is delegated to the [`SceneLoader`]
//! thread; the service only waits on or polls its answers.
//!
//! # States
//!
//! - **Idle**: no current scene, not playing
//! - **Playing**: current scene, playing
//! - **Paused**: current scene, not playing
//!
//! Guard failures (`SceneNotFound`, `InvalidSceneData`) leave state untouched.
//! Every error is also kept in `last_error()` and published on the bus; the
//! next successful operation clears it.
//!
//! # Non-blocking loads
//!
//! `begin_load()` queues a load and returns; `poll()` (call it from the
//! owner's update loop) applies the catalog once it arrives. Playback
//! transitions stay available meanwhile.

use std::path::PathBuf;

use chrono::{Local, Timelike};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event_bus::{ContentErrorRaised, EventBus, SceneTransition, ScenesLoaded};
use crate::core::loader::{Pending, SceneLoader};
use crate::entities::{Scene, SceneType, UserPreferences};
use crate::error::ContentError;

/// Playback state derived from (current scene, playing flag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Wall-clock hour source, injectable for tests
pub trait Clock: Send {
    /// Local hour of day, 0-23
    fn hour(&self) -> u32;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Clock frozen at one hour
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn hour(&self) -> u32 {
        self.0
    }
}

/// Scene types eligible at `hour`. Never mixes day and night sets.
pub fn scheduled_types(hour: u32) -> &'static [SceneType] {
    match hour % 24 {
        6..=11 => &[SceneType::Forest, SceneType::Ocean],
        12..=17 => &[SceneType::Rain, SceneType::Sunset],
        18..=22 => &[SceneType::Fireflies],
        _ => &[SceneType::Stars],
    }
}

/// Serializable copy of the published state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    pub state: PlaybackState,
    pub current_scene: Option<Scene>,
    pub available_scenes: Vec<Scene>,
    pub is_playing: bool,
    pub error: Option<String>,
}

/// Playback/recommendation engine driven by the UI
pub struct ContentService {
    loader: SceneLoader,
    available_scenes: Vec<Scene>,
    current_scene: Option<Scene>,
    is_playing: bool,
    error: Option<ContentError>,
    events: EventBus,
    clock: Box<dyn Clock>,
    pending_load: Option<Pending<Vec<Scene>>>,
}

impl ContentService {
    /// Create an idle service with an empty catalog
    pub fn new(loader: SceneLoader) -> Self {
        info!("ContentService initialized");
        Self {
            loader,
            available_scenes: Vec::new(),
            current_scene: None,
            is_playing: false,
            error: None,
            events: EventBus::new(),
            clock: Box::new(SystemClock),
            pending_load: None,
        }
    }

    /// Replace the wall-clock source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Bus publishing `ScenesLoaded`, `SceneTransition` and `ContentErrorRaised`
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // === Published state ===

    pub fn available_scenes(&self) -> &[Scene] {
        &self.available_scenes
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current_scene.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn last_error(&self) -> Option<&ContentError> {
        self.error.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        match (&self.current_scene, self.is_playing) {
            (Some(_), true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
            (None, _) => PlaybackState::Idle,
        }
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            state: self.state(),
            current_scene: self.current_scene.clone(),
            available_scenes: self.available_scenes.clone(),
            is_playing: self.is_playing,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn find_scene(&self, id: Uuid) -> Option<&Scene> {
        self.available_scenes.iter().find(|s| s.id == id)
    }

    /// Case-insensitive lookup by name
    pub fn find_scene_by_name(&self, name: &str) -> Option<&Scene> {
        let name = name.trim();
        self.available_scenes.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    // === Storage-backed operations ===

    /// Load the catalog and wait for it
    pub fn load_scenes(&mut self) -> Result<&[Scene], ContentError> {
        let pending = match self.pending_load.take() {
            Some(pending) => pending,
            None => self.loader.load_scenes(),
        };
        self.apply_load(pending.wait())?;
        Ok(&self.available_scenes)
    }

    /// Queue a load without waiting. No-op while one is in flight.
    pub fn begin_load(&mut self) {
        if self.pending_load.is_some() {
            trace!("Catalog load already in flight");
            return;
        }
        self.pending_load = Some(self.loader.load_scenes());
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Apply a finished background load. Returns None while nothing completed.
    pub fn poll(&mut self) -> Option<Result<usize, ContentError>> {
        let result = self.pending_load.as_ref()?.try_take()?;
        self.pending_load = None;
        Some(self.apply_load(result))
    }

    /// Rewrite the stored catalog and invalidate its cached copy.
    /// The in-memory catalog is untouched until the next load.
    pub fn migrate(&mut self) -> Result<usize, ContentError> {
        match self.loader.migrate().wait() {
            Ok(count) => {
                self.error = None;
                Ok(count)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Snapshot the catalog file. Advisory: failures are logged, never raised.
    pub fn backup(&self) -> Option<PathBuf> {
        match self.loader.backup().wait() {
            Ok(path) => path,
            Err(e) => {
                warn!("Backup skipped: {}", e);
                None
            }
        }
    }

    fn apply_load(&mut self, result: Result<Vec<Scene>, ContentError>) -> Result<usize, ContentError> {
        match result {
            Ok(scenes) => {
                let count = scenes.len();
                self.available_scenes = scenes;
                self.error = None;
                info!("Catalog ready: {} scenes", count);
                self.events.emit(ScenesLoaded { count });
                self.update_state();
                Ok(count)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    // === State machine ===

    /// Start `scene` from any state. The catalog's record is authoritative.
    pub fn start_scene(&mut self, scene: &Scene) -> Result<(), ContentError> {
        let Some(entry) = self.find_scene(scene.id).cloned() else {
            return Err(self.fail(ContentError::SceneNotFound(scene.id)));
        };
        if !entry.is_active {
            let reason = format!("scene '{}' ({}) is inactive", entry.name, entry.id);
            return Err(self.fail(ContentError::InvalidSceneData(reason)));
        }

        let previous = self.current_scene.as_ref().map(|s| s.id);
        info!("Scene transition: {:?} -> {} ({})", previous, entry.id, entry.name);

        self.current_scene = Some(entry);
        self.is_playing = true;
        self.error = None;
        self.publish_transition(previous);
        Ok(())
    }

    /// Back to Idle. Safe to call repeatedly.
    pub fn stop_scene(&mut self) {
        let Some(previous) = self.current_scene.take() else {
            self.is_playing = false;
            return;
        };
        self.is_playing = false;
        self.error = None;
        info!("Scene stopped: {} ({})", previous.id, previous.name);
        self.publish_transition(Some(previous.id));
    }

    /// Playing -> Paused. No-op in any other state.
    pub fn pause_scene(&mut self) {
        if self.state() != PlaybackState::Playing {
            trace!("pause ignored in {:?}", self.state());
            return;
        }
        self.is_playing = false;
        self.error = None;
        debug!("Scene paused");
        self.publish_transition(self.current_scene.as_ref().map(|s| s.id));
    }

    /// Paused -> Playing. No-op in any other state.
    pub fn resume_scene(&mut self) {
        if self.state() != PlaybackState::Paused {
            trace!("resume ignored in {:?}", self.state());
            return;
        }
        self.is_playing = true;
        self.error = None;
        debug!("Scene resumed");
        self.publish_transition(self.current_scene.as_ref().map(|s| s.id));
    }

    /// Pause when playing, resume when paused
    pub fn toggle_pause(&mut self) {
        match self.state() {
            PlaybackState::Playing => self.pause_scene(),
            PlaybackState::Paused => self.resume_scene(),
            PlaybackState::Idle => {}
        }
    }

    /// Stop if the current scene was deactivated or dropped from the catalog.
    /// Otherwise refresh it to the catalog's record.
    pub fn update_state(&mut self) {
        let Some(current_id) = self.current_scene.as_ref().map(|s| s.id) else {
            return;
        };
        let entry = self.find_scene(current_id).cloned();
        match entry {
            Some(entry) if entry.is_active => {
                self.current_scene = Some(entry);
            }
            Some(_) => {
                info!("Current scene {} was deactivated, stopping", current_id);
                self.stop_scene();
            }
            None => {
                info!("Current scene {} left the catalog, stopping", current_id);
                self.stop_scene();
            }
        }
    }

    /// Replace a catalog record by id (session only, not persisted)
    pub fn replace_scene(&mut self, scene: Scene) -> Result<(), ContentError> {
        if let Err(e) = scene.validate() {
            return Err(self.fail(e));
        }
        let Some(idx) = self.available_scenes.iter().position(|s| s.id == scene.id) else {
            return Err(self.fail(ContentError::SceneNotFound(scene.id)));
        };
        debug!("Replacing scene {} ({})", scene.id, scene.name);
        self.available_scenes[idx] = scene;
        self.error = None;
        self.update_state();
        Ok(())
    }

    // === Recommendation & scheduling ===

    /// Next scene to suggest: preferred (not current) first, else rotation.
    pub fn recommend_next_scene(&self, preferences: &UserPreferences) -> Option<&Scene> {
        let current_id = self.current_scene.as_ref().map(|s| s.id);

        if let Some(preferred) = self
            .available_scenes
            .iter()
            .find(|s| preferences.prefers(&s.id) && Some(s.id) != current_id)
        {
            return Some(preferred);
        }

        let count = self.available_scenes.len();
        if let Some(idx) = current_id.and_then(|id| self.available_scenes.iter().position(|s| s.id == id)) {
            return self.available_scenes.get((idx + 1) % count);
        }

        self.available_scenes.first()
    }

    /// Scene for the clock's current hour
    pub fn schedule_scene_for_current_time(&self) -> Option<&Scene> {
        self.schedule_scene_for_hour(self.clock.hour())
    }

    /// First catalog scene of a type scheduled for `hour`; no cross-period fallback.
    pub fn schedule_scene_for_hour(&self, hour: u32) -> Option<&Scene> {
        let kinds = scheduled_types(hour);
        self.available_scenes.iter().find(|s| kinds.contains(&s.kind))
    }

    // === Internals ===

    fn fail(&mut self, err: ContentError) -> ContentError {
        warn!("{}", err);
        self.error = Some(err.clone());
        self.events.emit(ContentErrorRaised { error: err.clone() });
        err
    }

    fn publish_transition(&self, previous: Option<Uuid>) {
        self.events.emit(SceneTransition {
            previous,
            current: self.current_scene.as_ref().map(|s| s.id),
            state: self.state(),
        });
    }
}
