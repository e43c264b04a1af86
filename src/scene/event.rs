//! Change notifications.

use crate::renderer::viewer::ViewportId;

/// Change notifications queued by a [`Scene`](super::Scene).
///
/// Entity events are coalesced: an entity that changes several times before
/// its value is read again produces one event. Events for locked components
/// are held back and delivered once on the final unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    /// An entity's model matrix is out of date.
    MatrixChanged(hecs::Entity),
    /// An entity's bounding boxes are out of date.
    BoundingBoxesChanged(hecs::Entity),
    /// An entity's union with its descendants is out of date.
    BoundsWithChildrenChanged(hecs::Entity),
    /// A viewport's pan, zoom, rotation or pivot changed.
    ViewportChanged(ViewportId),
}

impl SceneEvent {
    /// The entity the event is about, if any.
    pub fn entity(&self) -> Option<hecs::Entity> {
        match self {
            Self::MatrixChanged(e) | Self::BoundingBoxesChanged(e) | Self::BoundsWithChildrenChanged(e) => Some(*e),
            Self::ViewportChanged(_) => None,
        }
    }
}
