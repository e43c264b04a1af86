//! Centralised invalidation.
//!
//! Marks caches stale and queues change events. Nothing is recomputed here.

use super::{Scene, SceneEvent};
use crate::ecs::components::bounds::{Bounds, BoundsWithChildren};
use crate::ecs::components::crop::CropChildren;
use crate::ecs::components::transform::ModelMatrix;
use crate::ecs::systems::transform::parent_of;

/// What changed about an entity's boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    /// Shared hit-test geometry: image, matrix, layer.
    HitTest,
    /// Only the crop rectangle.
    Crop,
    /// Every viewport entry, e.g. texture offset or parallax.
    Viewports,
}

impl Scene {
    /// Mark the model matrix of an entity and its whole subtree stale.
    pub(crate) fn invalidate_matrix(&mut self, entity: hecs::Entity) {
        for e in self.subtree(entity) {
            let notify = match self.world.get::<&mut ModelMatrix>(e) {
                Ok(mut model) => {
                    let was_dirty = model.dirty;
                    model.dirty = true;
                    !model.lock.record_change() && !was_dirty
                }
                Err(_) => false,
            };
            if notify {
                self.events.push(SceneEvent::MatrixChanged(e));
            }
            self.invalidate_bounds(e, Change::HitTest);
        }
    }

    /// Mark an entity's boxes stale, along with every crop derived from them
    /// and every union that includes them.
    pub(crate) fn invalidate_bounds(&mut self, entity: hecs::Entity, change: Change) {
        let notify = match self.world.get::<&mut Bounds>(entity) {
            Ok(mut bounds) => {
                match change {
                    Change::HitTest => bounds.mark_hit_test_dirty(),
                    Change::Crop => bounds.mark_crop_dirty(),
                    Change::Viewports => bounds.mark_viewports_dirty(),
                }
                if bounds.lock.record_change() || bounds.notified {
                    false
                } else {
                    bounds.notified = true;
                    true
                }
            }
            Err(_) => return,
        };
        if notify {
            self.events.push(SceneEvent::BoundingBoxesChanged(entity));
        }

        let cropped = self
            .world
            .get::<&CropChildren>(entity)
            .map(|c| c.cropped.clone())
            .unwrap_or_default();
        for descendant in cropped {
            self.invalidate_bounds(descendant, Change::Crop);
        }

        self.invalidate_unions_from(entity);
    }

    /// Mark the unions of an entity and of all its ancestors stale.
    pub(crate) fn invalidate_unions_from(&mut self, entity: hecs::Entity) {
        let mut current = Some(entity);
        while let Some(e) = current {
            let notify = match self.world.get::<&mut BoundsWithChildren>(e) {
                Ok(mut union) => {
                    union.mark_dirty();
                    if union.lock.record_change() || union.notified {
                        false
                    } else {
                        union.notified = true;
                        true
                    }
                }
                Err(_) => false,
            };
            if notify {
                self.events.push(SceneEvent::BoundsWithChildrenChanged(e));
            }
            current = parent_of(&self.world, e);
        }
    }
}
