//! Error types
//!
//! Geometry reads never fail: missing inputs degrade to the last cached
//! bundle. Errors are reserved for misuse of the scene API.

use crate::renderer::viewer::{LayerId, ViewportId};

/// Errors returned by [`Scene`](crate::scene::Scene) mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The entity was despawned or never existed.
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(hecs::Entity),

    /// The viewport handle is not registered with this scene.
    #[error("viewport {0:?} is not registered")]
    UnknownViewport(ViewportId),

    /// The render layer handle is not registered with this scene.
    #[error("render layer {0:?} is not registered")]
    UnknownLayer(LayerId),

    /// Reparenting would make an entity its own ancestor.
    #[error("cannot parent {child:?} under {parent:?}: it would create a cycle")]
    HierarchyCycle {
        child: hecs::Entity,
        parent: hecs::Entity,
    },

    /// `unlock` was called without a matching `lock`.
    #[error("unlock without matching lock on {0:?}")]
    UnbalancedUnlock(hecs::Entity),
}

/// Result alias for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let err = SceneError::UnbalancedUnlock(e);
        assert!(err.to_string().starts_with("unlock without matching lock"));

        let err = SceneError::UnknownViewport(ViewportId::from_raw(7));
        assert!(err.to_string().contains("not registered"));
    }
}
