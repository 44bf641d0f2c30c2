//! Error taxonomy for the scene catalog and playback engine.
//!
//! Storage failures never reach service callers raw: the loader wraps them
//! into [`ContentError::SceneLoadFailed`]. Guard violations of the state
//! machine surface as [`ContentError::SceneNotFound`] or
//! [`ContentError::InvalidSceneData`] and leave the state untouched.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

/// Errors observable by users of [`crate::core::ContentService`].
///
/// `Clone` so the service can both return an error and keep it as the
/// published `error` field.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    #[error("scene not found: {0}")]
    SceneNotFound(Uuid),

    #[error("invalid scene data: {0}")]
    InvalidSceneData(String),

    #[error("failed to load scenes: {0}")]
    SceneLoadFailed(#[source] Arc<StoreError>),
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        ContentError::SceneLoadFailed(Arc::new(err))
    }
}

/// Failures of the persistent scene store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt scene document {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode scene document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("scene loader is no longer running")]
    Unavailable,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_store_error_wraps_as_load_failed() {
        let err: ContentError = StoreError::Unavailable.into();
        assert!(matches!(err, ContentError::SceneLoadFailed(_)));
        assert!(err.to_string().contains("no longer running"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_content_error_is_cloneable() {
        let err = ContentError::from(StoreError::io(
            "/nowhere/scenes.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.to_string().contains("scenes.json"));
    }
}
