//! LULL - ambient scene catalog and player library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (cache, store, loader, events, service)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;

// Re-export commonly used types from core
pub use crate::core::cache::{CacheStats, GenericCache};
pub use crate::core::event_bus::{BoxedEvent, EventBus, downcast_event};
pub use crate::core::loader::{Pending, SceneLoader};
pub use crate::core::service::{ContentService, PlaybackState};
pub use crate::core::store::{JsonSceneStore, SceneStore};

// Re-export entities
pub use entities::{Scene, SceneType, UserPreferences};
pub use error::{ContentError, StoreError};
