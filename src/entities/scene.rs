//! Scene: a short looping audiovisual content item.
//!
//! Scenes are immutable once they are part of a catalog. Any change (e.g.
//! deactivation) is expressed by replacing the whole record, see
//! [`Scene::with_active`].
//!
//! On-disk shape (one element of the catalog array):
//! ```json
//! { "id": "...", "name": "Ocean Waves", "type": "ocean", "description": "...",
//!   "duration": 300.0, "isActive": true,
//!   "metadata": { "author": "lull", "creationDate": "2026-01-01T00:00:00Z" } }
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContentError;

/// Closed set of scene kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
    Ocean,
    Forest,
    Fireflies,
    Rain,
    Sunset,
    Stars,
}

impl SceneType {
    /// Canonical order, also the order of the seed catalog.
    pub const ALL: [SceneType; 6] = [
        SceneType::Ocean,
        SceneType::Forest,
        SceneType::Fireflies,
        SceneType::Rain,
        SceneType::Sunset,
        SceneType::Stars,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SceneType::Ocean => "ocean",
            SceneType::Forest => "forest",
            SceneType::Fireflies => "fireflies",
            SceneType::Rain => "rain",
            SceneType::Sunset => "sunset",
            SceneType::Stars => "stars",
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Authoring information carried by every scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMetadata {
    pub author: String,
    pub creation_date: DateTime<Utc>,
}

impl Default for SceneMetadata {
    /// Used for documents written before metadata existed.
    fn default() -> Self {
        Self {
            author: "unknown".to_string(),
            creation_date: DateTime::<Utc>::default(),
        }
    }
}

/// A playable content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SceneType,
    #[serde(default)]
    pub description: String,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub metadata: SceneMetadata,
}

fn default_active() -> bool {
    true
}

impl Scene {
    /// Create an active scene with a fresh id, authored now.
    pub fn new(name: impl Into<String>, kind: SceneType, description: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            description: description.into(),
            duration,
            is_active: true,
            metadata: SceneMetadata {
                author: "lull".to_string(),
                creation_date: Utc::now(),
            },
        }
    }

    /// Check the record invariant: non-empty name and positive duration.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.name.trim().is_empty() {
            return Err(ContentError::InvalidSceneData(format!("scene {} has an empty name", self.id)));
        }
        if self.duration.is_zero() {
            return Err(ContentError::InvalidSceneData(format!(
                "scene '{}' ({}) has a non-positive duration",
                self.name, self.id
            )));
        }
        Ok(())
    }

    /// Replacement record with the activity gate changed.
    pub fn with_active(&self, is_active: bool) -> Scene {
        Scene {
            is_active,
            ..self.clone()
        }
    }
}

/// The seed catalog written on first run: one active scene per type.
pub fn default_catalog() -> Vec<Scene> {
    SceneType::ALL
        .iter()
        .map(|&kind| {
            let (name, description, secs) = match kind {
                SceneType::Ocean => ("Ocean Waves", "Slow swell rolling onto a quiet beach", 300),
                SceneType::Forest => ("Forest Morning", "Birdsong and light through the canopy", 300),
                SceneType::Fireflies => ("Fireflies", "Fireflies drifting over a summer meadow", 240),
                SceneType::Rain => ("Gentle Rain", "Steady rain on leaves and a tin roof", 360),
                SceneType::Sunset => ("Golden Sunset", "The sun sinking behind low hills", 240),
                SceneType::Stars => ("Starry Night", "A clear sky slowly turning overhead", 420),
            };
            Scene::new(name, kind, description, Duration::from_secs(secs))
        })
        .collect()
}

/// Serialize `Duration` as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|e| de::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_one_per_type() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 6);
        let kinds: Vec<SceneType> = catalog.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SceneType::ALL.to_vec());
        assert!(catalog.iter().all(|s| s.is_active));
        assert!(catalog.iter().all(|s| s.validate().is_ok()));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut scene = Scene::new("Rain", SceneType::Rain, "", Duration::from_secs(10));
        scene.name = "   ".to_string();
        assert!(matches!(scene.validate(), Err(ContentError::InvalidSceneData(_))));
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let scene = Scene::new("Rain", SceneType::Rain, "", Duration::ZERO);
        assert!(matches!(scene.validate(), Err(ContentError::InvalidSceneData(_))));
    }

    #[test]
    fn test_inactive_scene_is_still_valid() {
        let scene = Scene::new("Stars", SceneType::Stars, "", Duration::from_secs(5)).with_active(false);
        assert!(!scene.is_active);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_json_field_names() {
        let scene = Scene::new("Sunset", SceneType::Sunset, "warm", Duration::from_millis(1500));
        let value = serde_json::to_value(&scene).unwrap();
        assert_eq!(value["type"], "sunset");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["duration"], 1.5);
        assert!(value["metadata"]["creationDate"].is_string());
    }

    #[test]
    fn test_legacy_record_gets_defaults() {
        let json = r#"{"id":"6f1c1d7e-8a53-4f7b-9d43-1f0a5b2c9e11","name":"Old Rain","type":"rain","duration":60}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert!(scene.is_active);
        assert_eq!(scene.description, "");
        assert_eq!(scene.metadata, SceneMetadata::default());
        assert_eq!(scene.duration, Duration::from_secs(60));
    }

    #[test]
    fn test_negative_duration_is_a_decode_error() {
        let json = r#"{"id":"6f1c1d7e-8a53-4f7b-9d43-1f0a5b2c9e11","name":"x","type":"rain","duration":-1}"#;
        assert!(serde_json::from_str::<Scene>(json).is_err());
    }
}
