//! Core engine modules - cache, persistence, loader, events, service
//!
//! These modules form the content engine, independent of any UI.

pub mod cache;
pub mod event_bus;
pub mod loader;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use cache::{CacheStats, GenericCache};
pub use event_bus::EventBus;
pub use loader::{CATALOG_KEY, CatalogCache, Pending, SceneLoader};
pub use service::{Clock, ContentService, ContentSnapshot, FixedClock, PlaybackState, SystemClock};
pub use store::{JsonSceneStore, SceneStore};
