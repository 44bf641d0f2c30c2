//! User preferences consumed by the recommender.
//!
//! Owned by the settings side of the host application; this crate only reads it.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scene ids the user favors. Insertion order is kept but carries no weight:
/// the recommender breaks ties by catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub preferred_scenes: IndexSet<Uuid>,
}

impl UserPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Self {
        Self {
            preferred_scenes: ids.into_iter().collect(),
        }
    }

    pub fn prefers(&self, id: &Uuid) -> bool {
        self.preferred_scenes.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_scenes.is_empty()
    }
}
