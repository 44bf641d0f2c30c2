//! Entities module - data model shared by the engine and its callers

pub mod preferences;
pub mod scene;

pub use preferences::UserPreferences;
pub use scene::{Scene, SceneMetadata, SceneType, default_catalog};
