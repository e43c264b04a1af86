//! Render order comparator.
//!
//! Layers order coarsely: a larger layer Z is further back and draws first.
//! Inside a layer, entities order by the Z values along their path from the
//! root, compared level by level; an ancestor draws before its descendants.

use std::cmp::Ordering;

use glam::Vec2;
use smallvec::SmallVec;

use super::bounds;
use super::transform::{effective_layer, parent_of};
use crate::ecs::components::rendering::{Drawable, Image, SpriteFrame};
use crate::ecs::components::transform::Transform2D;
use crate::error::{Result, SceneError};
use crate::renderer::viewer::{LayerId, RenderLayer, ViewportId};
use crate::scene::Scene;

/// Precomputed ordering key of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOrderKey {
    pub layer_z: i32,
    /// `z + sprite z` of every node from the root down to the entity.
    pub path: SmallVec<[f32; 8]>,
}

fn own_z(world: &hecs::World, entity: hecs::Entity) -> f32 {
    let z = world
        .get::<&Transform2D>(entity)
        .map(|t| t.position.z)
        .unwrap_or(0.0);
    let sprite_z = world
        .get::<&SpriteFrame>(entity)
        .map(|f| f.z)
        .unwrap_or(0.0);
    z + sprite_z
}

impl RenderOrderKey {
    /// Build the key of an entity. Unregistered layers order like the default
    /// layer.
    pub fn of(scene: &Scene, entity: hecs::Entity) -> Self {
        let world = &scene.world;
        let layer_z = scene
            .layers
            .get(&effective_layer(world, entity))
            .or_else(|| scene.layers.get(&LayerId::DEFAULT))
            .map(|layer| layer.z)
            .unwrap_or(0);

        let mut path = SmallVec::new();
        let mut current = Some(entity);
        while let Some(e) = current {
            path.push(own_z(world, e));
            current = parent_of(world, e);
        }
        path.reverse();
        Self { layer_z, path }
    }

    /// Draw order: `Less` draws first.
    pub fn draw_cmp(&self, other: &Self) -> Ordering {
        other.layer_z.cmp(&self.layer_z).then_with(|| {
            for (a, b) in self.path.iter().zip(other.path.iter()) {
                match a.total_cmp(b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                }
            }
            self.path.len().cmp(&other.path.len())
        })
    }
}

/// Compare two entities by draw order. `Less` means `a` draws first.
pub fn compare(scene: &Scene, a: hecs::Entity, b: hecs::Entity) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    RenderOrderKey::of(scene, a).draw_cmp(&RenderOrderKey::of(scene, b))
}

/// Sort entities into draw order. Ties keep their relative order.
pub fn sort_draw_order(scene: &Scene, entities: &mut [hecs::Entity]) {
    let mut keyed: Vec<(RenderOrderKey, hecs::Entity)> = entities
        .iter()
        .map(|&e| (RenderOrderKey::of(scene, e), e))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.draw_cmp(b));
    for (slot, (_, entity)) in entities.iter_mut().zip(keyed) {
        *slot = entity;
    }
}

/// Shown entities with an image, in draw order.
pub fn display_list(scene: &Scene) -> Vec<hecs::Entity> {
    let mut entities: Vec<hecs::Entity> = scene
        .world
        .query::<&Image>()
        .iter()
        .map(|(entity, _)| entity)
        .filter(|&entity| scene.is_shown(entity))
        .collect();
    sort_draw_order(scene, &mut entities);
    entities
}

/// Top-most shown entity whose hit-test box contains a screen point given in
/// virtual resolution.
pub(crate) fn entity_at(scene: &mut Scene, point: Vec2, viewport_id: ViewportId) -> Result<Option<hecs::Entity>> {
    let viewport = scene
        .viewports
        .get(&viewport_id)
        .map(|slot| slot.viewport)
        .ok_or(SceneError::UnknownViewport(viewport_id))?;
    let virtual_resolution = scene.settings.virtual_resolution;

    for entity in display_list(scene).into_iter().rev() {
        let ignore_viewport = scene
            .world
            .get::<&Drawable>(entity)
            .map(|d| d.ignore_viewport)
            .unwrap_or(false);
        let world_point = if ignore_viewport {
            point
        } else {
            // Hit-test boxes are in virtual resolution whatever the layer's.
            let layer = scene
                .layers
                .get(&effective_layer(&scene.world, entity))
                .copied()
                .unwrap_or_default();
            let flat = RenderLayer {
                independent_resolution: None,
                ..layer
            };
            viewport
                .matrix_for(&flat, virtual_resolution)
                .inverse()
                .transform_point3(point.extend(0.0))
                .truncate()
        };

        if bounds::read(scene, entity, viewport_id)?.hits(world_point) {
            return Ok(Some(entity));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SceneSettings;

    fn scene() -> Scene {
        Scene::new(SceneSettings::default())
    }

    #[test]
    fn test_self_is_equal() {
        let mut scene = scene();
        let a = scene.spawn(Transform2D::identity().with_z(3.0));
        assert_eq!(compare(&scene, a, a), Ordering::Equal);
    }

    #[test]
    fn test_higher_z_draws_later() {
        let mut scene = scene();
        let parent = scene.spawn(Transform2D::identity());
        let a = scene.spawn(Transform2D::identity().with_z(5.0));
        let b = scene.spawn(Transform2D::identity().with_z(10.0));
        scene.set_parent(a, Some(parent)).unwrap();
        scene.set_parent(b, Some(parent)).unwrap();

        assert_eq!(compare(&scene, a, b), Ordering::Less);
        assert_eq!(compare(&scene, b, a), Ordering::Greater);
    }

    #[test]
    fn test_ancestor_draws_first() {
        let mut scene = scene();
        let parent = scene.spawn(Transform2D::identity().with_z(100.0));
        let child = scene.spawn(Transform2D::identity().with_z(-100.0));
        scene.set_parent(child, Some(parent)).unwrap();
        assert_eq!(compare(&scene, parent, child), Ordering::Less);
    }

    #[test]
    fn test_subtree_follows_its_root() {
        let mut scene = scene();
        let back = scene.spawn(Transform2D::identity().with_z(1.0));
        let front = scene.spawn(Transform2D::identity().with_z(2.0));
        let back_child = scene.spawn(Transform2D::identity().with_z(50.0));
        scene.set_parent(back_child, Some(back)).unwrap();
        assert_eq!(compare(&scene, back_child, front), Ordering::Less);
    }

    #[test]
    fn test_sprite_z_adds() {
        let mut scene = scene();
        let a = scene.spawn(Transform2D::identity().with_z(1.0));
        let b = scene.spawn(Transform2D::identity().with_z(0.0));
        scene
            .set_sprite_frame(b, Some(SpriteFrame::default().with_z(2.0)))
            .unwrap();
        assert_eq!(compare(&scene, a, b), Ordering::Less);
    }

    #[test]
    fn test_larger_layer_z_draws_first() {
        let mut scene = scene();
        let far = scene.add_layer(RenderLayer::new(100));
        let a = scene.spawn(Transform2D::identity().with_z(99.0));
        let b = scene.spawn(Transform2D::identity());
        scene.set_drawable(a, Drawable::new().on_layer(far)).unwrap();
        assert_eq!(compare(&scene, a, b), Ordering::Less);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut scene = scene();
        let a = scene.spawn(Transform2D::identity());
        let b = scene.spawn(Transform2D::identity());
        let c = scene.spawn(Transform2D::identity().with_z(-1.0));
        let mut order = vec![a, b, c];
        sort_draw_order(&scene, &mut order);
        assert_eq!(order, vec![c, a, b]);
    }
}
