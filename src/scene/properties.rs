//! Property setters.
//!
//! Each setter stores the new value and invalidates exactly what depends on
//! it. Setting a value equal to the current one does nothing.

use glam::Vec2;

use super::{Change, Scene};
use crate::ecs::components::bounds::BoundsWithChildren;
use crate::ecs::components::crop::{CropChildren, CropSelf};
use crate::ecs::components::lock::LockStep;
use crate::ecs::components::rendering::{Drawable, Image, SpriteFrame, TextLayout, Visible};
use crate::ecs::components::transform::Transform2D;
use crate::ecs::systems::crop::{release_crop_children, sync_crop_children};
use crate::ecs::systems::transform::parent_of;
use crate::error::{Result, SceneError};

impl Scene {
    fn put<T: hecs::Component>(&mut self, entity: hecs::Entity, value: Option<T>) -> Result<()> {
        match value {
            Some(value) => self
                .world
                .insert_one(entity, value)
                .map_err(|_| SceneError::NoSuchEntity(entity)),
            None => {
                self.ensure_entity(entity)?;
                let _ = self.world.remove_one::<T>(entity);
                Ok(())
            }
        }
    }

    fn get_copied<T: hecs::Component + Copy>(&self, entity: hecs::Entity) -> Result<Option<T>> {
        self.ensure_entity(entity)?;
        Ok(self.world.get::<&T>(entity).ok().map(|v| *v))
    }

    // Transform.

    pub fn transform(&self, entity: hecs::Entity) -> Result<Transform2D> {
        Ok(self.get_copied::<Transform2D>(entity)?.unwrap_or_default())
    }

    /// Replace the transform. A change of Z alone only reorders drawing.
    pub fn set_transform(&mut self, entity: hecs::Entity, transform: Transform2D) -> Result<()> {
        let previous = self.get_copied::<Transform2D>(entity)?;
        if previous == Some(transform) {
            return Ok(());
        }
        self.put(entity, Some(transform))?;

        let geometry_changed = previous.map_or(true, |p| {
            p.position.truncate() != transform.position.truncate()
                || p.scale != transform.scale
                || p.rotation != transform.rotation
                || p.pivot != transform.pivot
        });
        if geometry_changed {
            self.invalidate_matrix(entity);
        }
        Ok(())
    }

    fn update_transform(&mut self, entity: hecs::Entity, update: impl FnOnce(&mut Transform2D)) -> Result<()> {
        let mut transform = self.transform(entity)?;
        update(&mut transform);
        self.set_transform(entity, transform)
    }

    pub fn set_position(&mut self, entity: hecs::Entity, x: f32, y: f32) -> Result<()> {
        self.update_transform(entity, |t| {
            t.position.x = x;
            t.position.y = y;
        })
    }

    pub fn set_z(&mut self, entity: hecs::Entity, z: f32) -> Result<()> {
        self.update_transform(entity, |t| t.position.z = z)
    }

    pub fn set_scale(&mut self, entity: hecs::Entity, x: f32, y: f32) -> Result<()> {
        self.update_transform(entity, |t| t.scale = Vec2::new(x, y))
    }

    /// Set the rotation in degrees.
    pub fn set_rotation(&mut self, entity: hecs::Entity, degrees: f32) -> Result<()> {
        self.update_transform(entity, |t| t.rotation = degrees)
    }

    pub fn set_pivot(&mut self, entity: hecs::Entity, x: f32, y: f32) -> Result<()> {
        self.update_transform(entity, |t| t.pivot = Vec2::new(x, y))
    }

    // Appearance.

    pub fn image(&self, entity: hecs::Entity) -> Result<Option<Image>> {
        self.get_copied::<Image>(entity)
    }

    /// Set or clear the image. Descendants move too: the pivot is relative to
    /// the base size.
    pub fn set_image(&mut self, entity: hecs::Entity, image: Option<Image>) -> Result<()> {
        if self.get_copied::<Image>(entity)? == image {
            return Ok(());
        }
        self.put(entity, image)?;
        self.invalidate_matrix(entity);
        Ok(())
    }

    pub fn sprite_frame(&self, entity: hecs::Entity) -> Result<Option<SpriteFrame>> {
        self.get_copied::<SpriteFrame>(entity)
    }

    pub fn set_sprite_frame(&mut self, entity: hecs::Entity, frame: Option<SpriteFrame>) -> Result<()> {
        if self.get_copied::<SpriteFrame>(entity)? == frame {
            return Ok(());
        }
        self.put(entity, frame)?;
        self.invalidate_matrix(entity);
        Ok(())
    }

    pub fn drawable(&self, entity: hecs::Entity) -> Result<Drawable> {
        Ok(self.get_copied::<Drawable>(entity)?.unwrap_or_default())
    }

    pub fn set_drawable(&mut self, entity: hecs::Entity, drawable: Drawable) -> Result<()> {
        let previous = self.drawable(entity)?;
        if previous == drawable {
            return Ok(());
        }
        self.put(entity, Some(drawable))?;

        if previous.render_layer != drawable.render_layer {
            // Descendants may inherit the layer.
            self.invalidate_matrix(entity);
        } else if previous.ignore_viewport != drawable.ignore_viewport
            || previous.texture_offset != drawable.texture_offset
        {
            self.invalidate_bounds(entity, Change::Viewports);
        }
        Ok(())
    }

    pub fn set_texture_offset(&mut self, entity: hecs::Entity, u: f32, v: f32) -> Result<()> {
        let drawable = self.drawable(entity)?.with_texture_offset(u, v);
        self.set_drawable(entity, drawable)
    }

    pub fn set_visible(&mut self, entity: hecs::Entity, visible: bool) -> Result<()> {
        let previous = self.get_copied::<Visible>(entity)?.unwrap_or_default();
        if previous.0 == visible {
            return Ok(());
        }
        self.put(entity, Some(Visible(visible)))?;
        if let Some(parent) = parent_of(&self.world, entity) {
            self.invalidate_unions_from(parent);
        }
        self.resync_crop_containers_above(entity);
        Ok(())
    }

    // Cropping.

    pub fn crop(&self, entity: hecs::Entity) -> Result<Option<CropSelf>> {
        self.get_copied::<CropSelf>(entity)
    }

    pub fn set_crop(&mut self, entity: hecs::Entity, crop: Option<CropSelf>) -> Result<()> {
        if self.get_copied::<CropSelf>(entity)? == crop {
            return Ok(());
        }
        self.put(entity, crop)?;
        self.invalidate_bounds(entity, Change::Crop);
        Ok(())
    }

    pub fn crop_children(&self, entity: hecs::Entity) -> Result<Option<CropChildren>> {
        self.ensure_entity(entity)?;
        Ok(self.world.get::<&CropChildren>(entity).ok().map(|c| (*c).clone()))
    }

    /// Make the entity crop and scroll its descendants, update the settings,
    /// or stop with `None`.
    pub fn set_crop_children(&mut self, entity: hecs::Entity, settings: Option<CropChildren>) -> Result<()> {
        self.ensure_entity(entity)?;
        let previous = self.world.remove_one::<CropChildren>(entity).ok();
        match settings {
            Some(mut settings) => {
                if let Some(previous) = previous {
                    settings.cropped = previous.cropped;
                    settings.scrolled = previous.scrolled;
                }
                self.put(entity, Some(settings))?;
                // Outer containers stop at this one now.
                self.resync_crop_containers_above(entity);
                sync_crop_children(self, entity);
            }
            None => {
                if let Some(previous) = previous {
                    release_crop_children(self, entity, &previous);
                    self.resync_crop_containers_above(entity);
                }
            }
        }
        Ok(())
    }

    /// Scroll a crop-children container.
    pub fn set_start_point(&mut self, entity: hecs::Entity, x: f32, y: f32) -> Result<()> {
        let Some(mut settings) = self.crop_children(entity)? else {
            return Ok(());
        };
        if settings.start_point == Vec2::new(x, y) {
            return Ok(());
        }
        settings.start_point = Vec2::new(x, y);
        self.set_crop_children(entity, Some(settings))
    }

    // Optional participants.

    pub fn set_bounds_with_children(
        &mut self,
        entity: hecs::Entity,
        union: Option<BoundsWithChildren>,
    ) -> Result<()> {
        self.put(entity, union)
    }

    pub fn set_text_layout(&mut self, entity: hecs::Entity, layout: Option<Box<dyn LockStep>>) -> Result<()> {
        self.put(entity, layout.map(TextLayout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneEvent;

    #[test]
    fn test_equal_value_is_noop() {
        let mut scene = Scene::default();
        let e = scene.spawn(Transform2D::from_position(1.0, 2.0));
        scene.model_matrices(e);
        scene.drain_events();

        scene.set_position(e, 1.0, 2.0).unwrap();
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_z_alone_keeps_matrix() {
        let mut scene = Scene::default();
        let e = scene.spawn(Transform2D::identity());
        scene.model_matrices(e);
        scene.drain_events();

        scene.set_z(e, 4.0).unwrap();
        assert!(scene.drain_events().is_empty());
        assert_eq!(scene.transform(e).unwrap().position.z, 4.0);
    }

    #[test]
    fn test_setters_on_missing_entity() {
        let mut scene = Scene::default();
        let e = scene.spawn(Transform2D::identity());
        scene.despawn(e).unwrap();
        assert_eq!(scene.set_position(e, 1.0, 1.0), Err(SceneError::NoSuchEntity(e)));
        assert_eq!(scene.set_image(e, None), Err(SceneError::NoSuchEntity(e)));
    }

    #[test]
    fn test_image_change_moves_children() {
        let mut scene = Scene::default();
        let parent = scene.spawn(Transform2D::identity().with_pivot(0.5, 0.5));
        let child = scene.spawn(Transform2D::identity());
        scene.set_parent(child, Some(parent)).unwrap();
        scene.model_matrices(child);
        scene.drain_events();

        scene.set_image(parent, Some(Image::new(20.0, 20.0))).unwrap();
        assert!(scene.drain_events().contains(&SceneEvent::MatrixChanged(child)));
        let m = scene.model_matrices(child).unwrap();
        assert_eq!(m.in_object_resolution.w_axis.truncate(), glam::Vec3::new(-10.0, -10.0, 0.0));
    }
}
