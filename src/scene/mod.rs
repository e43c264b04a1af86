//! Scene
//!
//! Owns the ECS world, the registered viewports and render layers, and the
//! change event queue. Every mutation goes through the scene so invalidation
//! happens in one place; reads rebuild whatever went stale.

mod event;
mod hierarchy;
mod invalidate;
mod properties;

pub use event::SceneEvent;
pub(crate) use invalidate::Change;

use glam::Vec2;
use rustc_hash::FxHashMap;

use crate::ecs::components::bounds::{Bounds, BoundingBoxes, BoundsWithChildren};
use crate::ecs::components::transform::{ModelMatrices, ModelMatrix};
use crate::ecs::systems::{bounds, lock_step, render_order, transform};
use crate::error::{Result, SceneError};
use crate::renderer::viewer::{LayerId, LayerMap, RenderLayer, Viewport, ViewportId, ViewportMatrixCache};
use crate::settings::SceneSettings;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewportSlot {
    pub viewport: Viewport,
    /// Bumped whenever the view moves; box caches compare against it.
    pub revision: u64,
}

/// A 2D scene.
///
/// `Scene` is `Send + Sync`; hosts that share it across threads wrap it in
/// their own lock.
pub struct Scene {
    pub(crate) world: hecs::World,
    pub(crate) settings: SceneSettings,
    pub(crate) layers: LayerMap,
    next_layer: u32,
    pub(crate) viewports: FxHashMap<ViewportId, ViewportSlot>,
    next_viewport: u32,
    pub(crate) viewport_matrices: ViewportMatrixCache,
    pub(crate) events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneSettings::default())
    }
}

impl Scene {
    /// Create an empty scene. The default layer is registered as
    /// [`LayerId::DEFAULT`].
    pub fn new(settings: SceneSettings) -> Self {
        let mut layers = LayerMap::default();
        layers.insert(LayerId::DEFAULT, settings.default_layer);
        tracing::debug!(virtual_resolution = ?settings.virtual_resolution, "created scene");
        Self {
            world: hecs::World::new(),
            settings,
            layers,
            next_layer: 1,
            viewports: FxHashMap::default(),
            next_viewport: 0,
            viewport_matrices: ViewportMatrixCache::new(),
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn virtual_resolution(&self) -> Vec2 {
        self.settings.virtual_resolution
    }

    /// Read-only access to the ECS world.
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn contains(&self, entity: hecs::Entity) -> bool {
        self.world.contains(entity)
    }

    pub(crate) fn ensure_entity(&self, entity: hecs::Entity) -> Result<()> {
        if self.world.contains(entity) {
            Ok(())
        } else {
            Err(SceneError::NoSuchEntity(entity))
        }
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // Render layers.

    /// Register a render layer.
    pub fn add_layer(&mut self, layer: RenderLayer) -> LayerId {
        let id = LayerId::from_raw(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(id, layer);
        tracing::debug!(?id, z = layer.z, "registered render layer");
        id
    }

    pub fn layer(&self, id: LayerId) -> Option<&RenderLayer> {
        self.layers.get(&id)
    }

    /// Replace a layer's settings.
    pub fn set_layer(&mut self, id: LayerId, layer: RenderLayer) -> Result<()> {
        let previous = *self.layers.get(&id).ok_or(SceneError::UnknownLayer(id))?;
        if previous == layer {
            return Ok(());
        }
        self.layers.insert(id, layer);

        if previous.independent_resolution != layer.independent_resolution {
            // Resolution conversions run across layers along parent chains.
            self.invalidate_all_matrices();
        } else if previous.parallax_speed != layer.parallax_speed {
            let members: Vec<_> = self
                .world
                .query::<&Bounds>()
                .iter()
                .map(|(e, _)| e)
                .filter(|&e| transform::effective_layer(&self.world, e) == id)
                .collect();
            for entity in members {
                self.invalidate_bounds(entity, Change::Viewports);
            }
        }
        tracing::debug!(?id, "updated render layer");
        Ok(())
    }

    /// Unregister a layer. Entities still on it keep their last boxes.
    ///
    /// # Panics
    /// Panics when asked to remove the default layer.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<RenderLayer> {
        assert_ne!(id, LayerId::DEFAULT, "the default layer cannot be removed");
        let layer = self.layers.remove(&id).ok_or(SceneError::UnknownLayer(id))?;
        self.viewport_matrices.forget_layer(id);
        self.invalidate_all_matrices();
        tracing::debug!(?id, "removed render layer");
        Ok(layer)
    }

    // Viewports.

    /// Register a viewport.
    pub fn add_viewport(&mut self, viewport: Viewport) -> ViewportId {
        let id = ViewportId::from_raw(self.next_viewport);
        self.next_viewport += 1;
        self.viewports.insert(id, ViewportSlot { viewport, revision: 0 });
        tracing::debug!(?id, "registered viewport");
        id
    }

    pub fn viewport(&self, id: ViewportId) -> Option<&Viewport> {
        self.viewports.get(&id).map(|slot| &slot.viewport)
    }

    /// Registered viewports, in no particular order.
    pub fn viewports(&self) -> impl Iterator<Item = (ViewportId, &Viewport)> {
        self.viewports.iter().map(|(id, slot)| (*id, &slot.viewport))
    }

    /// Replace a viewport's settings. Boxes seen through it go stale only if
    /// the view itself moved.
    pub fn set_viewport(&mut self, id: ViewportId, viewport: Viewport) -> Result<()> {
        let slot = self
            .viewports
            .get_mut(&id)
            .ok_or(SceneError::UnknownViewport(id))?;
        let moved = viewport.view_differs(&slot.viewport);
        slot.viewport = viewport;
        if moved {
            slot.revision += 1;
            self.events.push(SceneEvent::ViewportChanged(id));
        }
        Ok(())
    }

    /// Unregister a viewport and drop every cache entry for it.
    pub fn remove_viewport(&mut self, id: ViewportId) -> Result<Viewport> {
        let slot = self.viewports.remove(&id).ok_or(SceneError::UnknownViewport(id))?;
        self.viewport_matrices.forget_viewport(id);
        for (_, bounds) in self.world.query_mut::<&mut Bounds>() {
            bounds.forget_viewport(id);
        }
        for (_, union) in self.world.query_mut::<&mut BoundsWithChildren>() {
            union.entries.remove(&id);
        }
        tracing::debug!(?id, "removed viewport");
        Ok(slot.viewport)
    }

    pub(crate) fn viewport_revision(&self, id: ViewportId) -> Result<u64> {
        self.viewports
            .get(&id)
            .map(|slot| slot.revision)
            .ok_or(SceneError::UnknownViewport(id))
    }

    /// Number of viewport matrices built so far.
    pub fn viewport_matrix_builds(&self) -> u64 {
        self.viewport_matrices.builds()
    }

    // Reads.

    /// Model matrices of an entity, rebuilt if stale. `None` when the entity
    /// does not exist or has never had complete inputs.
    pub fn model_matrices(&mut self, entity: hecs::Entity) -> Option<ModelMatrices> {
        transform::model_matrices(self, entity)
    }

    /// Bounding boxes of an entity in a viewport.
    ///
    /// While the entity's boxes are locked this returns the pre-lock value.
    pub fn bounding_boxes(&mut self, entity: hecs::Entity, viewport: ViewportId) -> Result<BoundingBoxes> {
        bounds::read(self, entity, viewport)
    }

    /// Union of an entity's boxes with its shown descendants'. The entity
    /// needs a [`BoundsWithChildren`] component.
    pub fn bounds_with_children(&mut self, entity: hecs::Entity, viewport: ViewportId) -> Result<BoundingBoxes> {
        bounds::read_union(self, entity, viewport)
    }

    /// Top-most shown entity under a screen point (virtual resolution).
    pub fn entity_at(&mut self, point: Vec2, viewport: ViewportId) -> Result<Option<hecs::Entity>> {
        render_order::entity_at(self, point, viewport)
    }

    /// Shown entities with an image, in draw order.
    pub fn display_list(&self) -> Vec<hecs::Entity> {
        render_order::display_list(self)
    }

    // Lock-step.

    pub fn lock_matrix(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::lock_matrix(self, entity)
    }

    pub fn prepare_matrix_for_unlock(&mut self, entity: hecs::Entity) -> Result<bool> {
        lock_step::prepare_matrix_for_unlock(self, entity)
    }

    pub fn unlock_matrix(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::unlock_matrix(self, entity)
    }

    /// Freeze what readers see of an entity's boxes.
    pub fn lock_bounds(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::lock_bounds(self, entity)
    }

    /// Recompute boxes changed under the lock without notifying anyone.
    pub fn prepare_bounds_for_unlock(&mut self, entity: hecs::Entity) -> Result<bool> {
        lock_step::prepare_bounds_for_unlock(self, entity)
    }

    /// Release a box lock. The final release sends one
    /// [`SceneEvent::BoundingBoxesChanged`] if anything changed.
    pub fn unlock_bounds(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::unlock_bounds(self, entity)
    }

    pub fn lock_bounds_with_children(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::lock_bounds_with_children(self, entity)
    }

    pub fn prepare_bounds_with_children_for_unlock(&mut self, entity: hecs::Entity) -> Result<bool> {
        lock_step::prepare_bounds_with_children_for_unlock(self, entity)
    }

    pub fn unlock_bounds_with_children(&mut self, entity: hecs::Entity) -> Result<()> {
        lock_step::unlock_bounds_with_children(self, entity)
    }

    fn invalidate_all_matrices(&mut self) {
        let roots: Vec<_> = self
            .world
            .query::<hecs::Without<&ModelMatrix, &crate::ecs::components::transform::Parent>>()
            .iter()
            .map(|(e, _)| e)
            .collect();
        for root in roots {
            self.invalidate_matrix(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_scene_is_send_sync() {
        assert_send_sync::<Scene>();
    }

    #[test]
    fn test_default_layer_registered() {
        let scene = Scene::default();
        assert_eq!(scene.layer(LayerId::DEFAULT), Some(&RenderLayer::new(0)));
    }

    #[test]
    #[should_panic(expected = "default layer")]
    fn test_default_layer_cannot_be_removed() {
        let mut scene = Scene::default();
        let _ = scene.remove_layer(LayerId::DEFAULT);
    }

    #[test]
    fn test_viewport_ids_are_identities() {
        let mut scene = Scene::default();
        let a = scene.add_viewport(Viewport::new());
        let b = scene.add_viewport(Viewport::new());
        assert_ne!(a, b);
        assert_eq!(scene.viewport(a), scene.viewport(b));
    }

    #[test]
    fn test_viewport_event_only_when_view_moves() {
        let mut scene = Scene::default();
        let id = scene.add_viewport(Viewport::new());

        scene.set_viewport(id, Viewport::new().z(3)).unwrap();
        assert!(scene.drain_events().is_empty());

        scene.set_viewport(id, Viewport::new().pan(5.0, 0.0)).unwrap();
        assert_eq!(scene.drain_events(), vec![SceneEvent::ViewportChanged(id)]);
    }

    #[test]
    fn test_unknown_handles() {
        let mut scene = Scene::default();
        let missing = ViewportId::from_raw(9);
        assert_eq!(
            scene.set_viewport(missing, Viewport::new()),
            Err(SceneError::UnknownViewport(missing))
        );
        let layer = LayerId::from_raw(9);
        assert_eq!(
            scene.set_layer(layer, RenderLayer::new(1)),
            Err(SceneError::UnknownLayer(layer))
        );
    }
}
