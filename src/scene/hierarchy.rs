//! Entity lifetime and the parent/child tree.

use super::{Change, Scene};
use crate::ecs::components::bounds::Bounds;
use crate::ecs::components::crop::CropChildren;
use crate::ecs::components::rendering::{Drawable, Image, Visible};
use crate::ecs::components::transform::{Children, ModelMatrix, Parent, Transform2D};
use crate::ecs::systems::crop::{release_crop_children, sync_crop_children};
use crate::ecs::systems::transform::parent_of;
use crate::error::{Result, SceneError};

impl Scene {
    /// Spawn an entity with a transform and empty caches.
    pub fn spawn(&mut self, transform: Transform2D) -> hecs::Entity {
        self.world.spawn((
            transform,
            ModelMatrix::default(),
            Bounds::default(),
            Drawable::default(),
            Visible::default(),
        ))
    }

    /// Spawn an entity that already has an image.
    pub fn spawn_image(&mut self, transform: Transform2D, image: Image) -> hecs::Entity {
        let entity = self.spawn(transform);
        // Freshly spawned, so the insert cannot miss.
        let _ = self.world.insert_one(entity, image);
        entity
    }

    /// Despawn an entity. Its children are detached and become roots.
    pub fn despawn(&mut self, entity: hecs::Entity) -> Result<()> {
        self.ensure_entity(entity)?;
        let containers = self.crop_containers_above(entity);

        if let Ok(settings) = self.world.remove_one::<CropChildren>(entity) {
            release_crop_children(self, entity, &settings);
        }
        if let Some(parent) = parent_of(&self.world, entity) {
            self.invalidate_unions_from(parent);
            self.detach(entity, parent);
        }
        for child in self.children(entity) {
            let _ = self.world.remove_one::<Parent>(child);
            self.invalidate_matrix(child);
        }

        self.world
            .despawn(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        for container in containers {
            sync_crop_children(self, container);
        }
        tracing::debug!(?entity, "despawned");
        Ok(())
    }

    pub fn parent(&self, entity: hecs::Entity) -> Option<hecs::Entity> {
        parent_of(&self.world, entity)
    }

    pub fn children(&self, entity: hecs::Entity) -> Vec<hecs::Entity> {
        self.world
            .get::<&Children>(entity)
            .map(|c| c.0.clone())
            .unwrap_or_default()
    }

    /// Attach `child` under `parent`, or make it a root with `None`.
    pub fn set_parent(&mut self, child: hecs::Entity, parent: Option<hecs::Entity>) -> Result<()> {
        self.ensure_entity(child)?;
        if let Some(parent) = parent {
            self.ensure_entity(parent)?;
            if parent == child || self.ancestors(parent).contains(&child) {
                return Err(SceneError::HierarchyCycle { child, parent });
            }
        }
        let previous = parent_of(&self.world, child);
        if previous == parent {
            return Ok(());
        }

        let mut containers = self.crop_containers_above(child);
        if let Some(previous) = previous {
            self.invalidate_unions_from(previous);
            self.detach(child, previous);
        }
        if let Some(parent) = parent {
            self.world
                .insert_one(child, Parent(parent))
                .map_err(|_| SceneError::NoSuchEntity(child))?;
            if self.world.satisfies::<&Children>(parent).unwrap_or(false) {
                if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
                    children.0.push(child);
                }
            } else {
                self.world
                    .insert_one(parent, Children(vec![child]))
                    .map_err(|_| SceneError::NoSuchEntity(parent))?;
            }
        }
        tracing::debug!(?child, ?previous, ?parent, "reparented");

        self.invalidate_matrix(child);
        for container in self.crop_containers_above(child) {
            if !containers.contains(&container) {
                containers.push(container);
            }
        }
        for container in containers {
            sync_crop_children(self, container);
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s children list and drop its `Parent`.
    fn detach(&mut self, child: hecs::Entity, parent: hecs::Entity) {
        if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
            children.0.retain(|&c| c != child);
        }
        let _ = self.world.remove_one::<Parent>(child);
    }

    /// The entity followed by all its descendants, depth first.
    pub fn subtree(&self, root: hecs::Entity) -> Vec<hecs::Entity> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            out.push(entity);
            stack.extend(self.children(entity).into_iter().rev());
        }
        out
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, entity: hecs::Entity) -> Vec<hecs::Entity> {
        let mut out = Vec::new();
        let mut current = parent_of(&self.world, entity);
        while let Some(e) = current {
            out.push(e);
            current = parent_of(&self.world, e);
        }
        out
    }

    pub(crate) fn crop_containers_above(&self, entity: hecs::Entity) -> Vec<hecs::Entity> {
        self.ancestors(entity)
            .into_iter()
            .filter(|&e| self.world.satisfies::<&CropChildren>(e).unwrap_or(false))
            .collect()
    }

    /// The entity's own visibility flag.
    pub(crate) fn is_visible_flag(&self, entity: hecs::Entity) -> bool {
        self.world
            .get::<&Visible>(entity)
            .map(|v| v.0)
            .unwrap_or(true)
    }

    /// Visible, and so is every ancestor.
    pub fn is_shown(&self, entity: hecs::Entity) -> bool {
        self.world.contains(entity)
            && self.is_visible_flag(entity)
            && self.ancestors(entity).into_iter().all(|e| self.is_visible_flag(e))
    }

    pub(crate) fn resync_crop_containers_above(&mut self, entity: hecs::Entity) {
        for container in self.crop_containers_above(entity) {
            sync_crop_children(self, container);
        }
    }

    pub(crate) fn invalidate_subtree_bounds(&mut self, entity: hecs::Entity, change: Change) {
        for e in self.subtree(entity) {
            self.invalidate_bounds(e, change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_parent_links_both_ways() {
        let mut scene = Scene::default();
        let parent = scene.spawn(Transform2D::identity());
        let child = scene.spawn(Transform2D::identity());
        scene.set_parent(child, Some(parent)).unwrap();
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.children(parent), vec![child]);

        scene.set_parent(child, None).unwrap();
        assert_eq!(scene.parent(child), None);
        assert!(scene.children(parent).is_empty());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut scene = Scene::default();
        let a = scene.spawn(Transform2D::identity());
        let b = scene.spawn(Transform2D::identity());
        scene.set_parent(b, Some(a)).unwrap();
        assert_eq!(
            scene.set_parent(a, Some(b)),
            Err(SceneError::HierarchyCycle { child: a, parent: b })
        );
        assert_eq!(
            scene.set_parent(a, Some(a)),
            Err(SceneError::HierarchyCycle { child: a, parent: a })
        );
    }

    #[test]
    fn test_despawn_detaches_children() {
        let mut scene = Scene::default();
        let parent = scene.spawn(Transform2D::from_position(10.0, 0.0));
        let child = scene.spawn(Transform2D::identity());
        scene.set_parent(child, Some(parent)).unwrap();

        scene.despawn(parent).unwrap();
        assert!(!scene.contains(parent));
        assert_eq!(scene.parent(child), None);
        let m = scene.model_matrices(child).unwrap();
        assert_eq!(m.in_object_resolution, glam::Mat4::IDENTITY);
        assert_eq!(scene.despawn(parent), Err(SceneError::NoSuchEntity(parent)));
    }

    #[test]
    fn test_hidden_ancestor_hides_subtree() {
        let mut scene = Scene::default();
        let parent = scene.spawn(Transform2D::identity());
        let child = scene.spawn(Transform2D::identity());
        scene.set_parent(child, Some(parent)).unwrap();
        scene.set_visible(parent, false).unwrap();
        assert!(!scene.is_shown(child));
        assert!(scene.is_visible_flag(child));
    }
}
