//! Bounding box read path.
//!
//! `ensure_fresh` is the single entry point: it checks an entry's freshness
//! and rebuilds only what went stale. Reads while a box lock is held return
//! the pre-lock snapshot.

use glam::{Mat4, Vec2};

use super::crop::resolve_crop_area;
use super::transform::{effective_layer, model_matrices};
use crate::ecs::components::bounds::{Bounds, BoundingBoxes, BoundsWithChildren, Freshness, Staleness};
use crate::ecs::components::rendering::{Drawable, Image};
use crate::ecs::components::transform::ModelMatrices;
use crate::error::{Result, SceneError};
use crate::renderer::geometry::{
    build_hit_test_box, build_intermediate_box, build_render_box, crop, BoundingBox, BoundingBoxKind,
    CropInfo,
};
use crate::renderer::viewer::{LayerId, RenderLayer, Viewport, ViewportId};
use crate::scene::Scene;

/// Get an entity's boxes for a viewport, honoring box locks.
pub(crate) fn read(scene: &mut Scene, entity: hecs::Entity, viewport_id: ViewportId) -> Result<BoundingBoxes> {
    let viewport_revision = scene.viewport_revision(viewport_id)?;
    let snapshot = {
        let bounds = scene
            .world
            .get::<&Bounds>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        bounds.lock.is_locked().then(|| {
            bounds
                .lock
                .snapshot()
                .and_then(|s| s.get(&viewport_id).copied())
                .unwrap_or_default()
        })
    };
    match snapshot {
        Some(boxes) => Ok(boxes),
        None => Ok(ensure_fresh(scene, entity, viewport_id, viewport_revision)),
    }
}

/// Return the entry for a viewport, rebuilding it if stale. Ignores locks.
pub(crate) fn ensure_fresh(
    scene: &mut Scene,
    entity: hecs::Entity,
    viewport_id: ViewportId,
    viewport_revision: u64,
) -> BoundingBoxes {
    let ignore_viewport = scene
        .world
        .get::<&Drawable>(entity)
        .map(|d| d.ignore_viewport)
        .unwrap_or(false);
    {
        let Ok(mut bounds) = scene.world.get::<&mut Bounds>(entity) else {
            return BoundingBoxes::default();
        };
        match bounds.freshness(viewport_id, viewport_revision) {
            Freshness::Clean => {
                bounds.notified = false;
                return bounds.cached(viewport_id).unwrap_or_default();
            }
            // Screen-space entities do not move with the viewport.
            Freshness::Stale(Staleness::Viewport) if ignore_viewport => {
                return bounds.mark_clean(viewport_id, viewport_revision);
            }
            Freshness::Stale(_) => {}
        }
    }
    recompute(scene, entity, viewport_id, viewport_revision)
}

struct Inputs {
    base_size: Vec2,
    drawable: Drawable,
    layer_id: LayerId,
    layer: RenderLayer,
    viewport: Viewport,
    matrices: ModelMatrices,
}

fn gather(scene: &mut Scene, entity: hecs::Entity, viewport_id: ViewportId) -> Option<Inputs> {
    let base_size = scene.world.get::<&Image>(entity).ok()?.size();
    let drawable = *scene.world.get::<&Drawable>(entity).ok()?;
    let layer_id = effective_layer(&scene.world, entity);
    let layer = *scene.layers.get(&layer_id)?;
    let viewport = scene.viewports.get(&viewport_id)?.viewport;
    let matrices = model_matrices(scene, entity)?;
    Some(Inputs {
        base_size,
        drawable,
        layer_id,
        layer,
        viewport,
        matrices,
    })
}

fn recompute(
    scene: &mut Scene,
    entity: hecs::Entity,
    viewport_id: ViewportId,
    viewport_revision: u64,
) -> BoundingBoxes {
    let Some(inputs) = gather(scene, entity, viewport_id) else {
        tracing::trace!(?entity, ?viewport_id, "bounding box inputs missing, keeping last value");
        return match scene.world.get::<&mut Bounds>(entity) {
            Ok(mut bounds) => {
                bounds.hit_test_dirty = false;
                bounds.mark_clean(viewport_id, viewport_revision)
            }
            Err(_) => BoundingBoxes::default(),
        };
    };
    let Inputs {
        base_size,
        drawable,
        layer_id,
        layer,
        viewport,
        matrices,
    } = inputs;
    let virtual_resolution = scene.settings.virtual_resolution;

    let (hit_test_intermediate, hit_test_box) = {
        let Ok(mut bounds) = scene.world.get::<&mut Bounds>(entity) else {
            return BoundingBoxes::default();
        };
        if bounds.hit_test_dirty {
            let intermediate =
                build_intermediate_box(base_size.x, base_size.y, &matrices.in_virtual_resolution);
            bounds.hit_test_intermediate = intermediate;
            bounds.hit_test_box = build_hit_test_box(&intermediate);
            bounds.hit_test_dirty = false;
        }
        (bounds.hit_test_intermediate, bounds.hit_test_box)
    };

    let render_intermediate = if layer.resolution_factor(virtual_resolution) == Vec2::ONE {
        hit_test_intermediate
    } else {
        build_intermediate_box(base_size.x, base_size.y, &matrices.in_object_resolution)
    };

    let viewport_matrix = if drawable.ignore_viewport {
        Mat4::IDENTITY
    } else {
        scene
            .viewport_matrices
            .get_matrix(viewport_id, &viewport, layer_id, &layer, virtual_resolution)
    };
    let (pre_crop_render_box, viewport_scale) = build_render_box(&render_intermediate, &viewport_matrix);
    if viewport_scale.x <= f32::EPSILON || viewport_scale.y <= f32::EPSILON {
        tracing::warn!(?viewport_id, ?viewport_scale, "viewport collapses geometry");
    }

    let render_crop_scale = if base_size.x > 0.0 && base_size.y > 0.0 {
        pre_crop_render_box.edge_lengths() / base_size
    } else {
        Vec2::ZERO
    };
    let area = resolve_crop_area(scene, entity, viewport_id, &pre_crop_render_box, render_crop_scale);
    let render_crop = crop(
        &pre_crop_render_box,
        BoundingBoxKind::Render,
        area.as_ref(),
        render_crop_scale,
    );

    let boxes = if render_crop.is_fully_cropped() {
        BoundingBoxes {
            hit_test_box: None,
            pre_crop_render_box,
            render_box: BoundingBox::EMPTY,
            texture_box: BoundingBox::UNIT.translate(drawable.texture_offset),
            fully_cropped: true,
        }
    } else {
        let hit_test_scale = hit_test_crop_scale(&hit_test_intermediate, base_size);
        let hit_test_box = match crop(
            &hit_test_intermediate,
            BoundingBoxKind::HitTest,
            area.as_ref(),
            hit_test_scale,
        ) {
            CropInfo::Uncropped => Some(hit_test_box),
            CropInfo::Cropped { bounding_box, .. } => Some(build_hit_test_box(&bounding_box)),
            CropInfo::FullyCropped => None,
        };
        BoundingBoxes {
            hit_test_box,
            pre_crop_render_box,
            render_box: render_crop.resolve(&pre_crop_render_box),
            texture_box: render_crop
                .texture_box()
                .unwrap_or(BoundingBox::UNIT)
                .translate(drawable.texture_offset),
            fully_cropped: false,
        }
    };

    if let Ok(mut bounds) = scene.world.get::<&mut Bounds>(entity) {
        bounds.store(viewport_id, viewport_revision, boxes);
    }
    tracing::trace!(?entity, ?viewport_id, fully_cropped = boxes.fully_cropped, "recomputed bounding boxes");
    boxes
}

/// Scale mapping the hit-test box to local crop pixels.
///
/// Measured on the hit-test box itself, so neither the viewport zoom nor the
/// layer's resolution factor leaks in. A zero-sized image gives a zero scale.
fn hit_test_crop_scale(hit_test_intermediate: &BoundingBox, base_size: Vec2) -> Vec2 {
    if base_size.x <= 0.0 || base_size.y <= 0.0 {
        return Vec2::ZERO;
    }
    hit_test_intermediate.edge_lengths() / base_size
}

/// Get the union of an entity's boxes and its visible descendants', honoring
/// union locks.
pub(crate) fn read_union(scene: &mut Scene, entity: hecs::Entity, viewport_id: ViewportId) -> Result<BoundingBoxes> {
    let viewport_revision = scene.viewport_revision(viewport_id)?;
    let snapshot = {
        let union = scene
            .world
            .get::<&BoundsWithChildren>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        union.lock.is_locked().then(|| {
            union
                .lock
                .snapshot()
                .and_then(|s| s.get(&viewport_id).copied())
                .unwrap_or_default()
        })
    };
    match snapshot {
        Some(boxes) => Ok(boxes),
        None => Ok(ensure_union_fresh(scene, entity, viewport_id, viewport_revision)),
    }
}

fn merge(acc: &mut Option<BoundingBox>, next: BoundingBox) {
    *acc = Some(match acc {
        Some(current) => current.union(&next),
        None => next.axis_aligned(),
    });
}

/// Return the union for a viewport, rebuilding it if stale. Ignores the
/// union's own lock; member boxes are read through their locks.
pub(crate) fn ensure_union_fresh(
    scene: &mut Scene,
    entity: hecs::Entity,
    viewport_id: ViewportId,
    viewport_revision: u64,
) -> BoundingBoxes {
    let excluded = {
        let Ok(mut union) = scene.world.get::<&mut BoundsWithChildren>(entity) else {
            return BoundingBoxes::default();
        };
        if let Some(boxes) = union.fresh(viewport_id, viewport_revision) {
            union.notified = false;
            return boxes;
        }
        union.excluded.clone()
    };

    let mut render_box = None;
    let mut pre_crop_render_box = None;
    let mut hit_test_box = None;
    let mut stack = vec![entity];
    while let Some(node) = stack.pop() {
        if node != entity && (excluded.contains(&node) || !scene.is_shown(node)) {
            continue;
        }
        let boxes = read(scene, node, viewport_id).unwrap_or_default();
        if !boxes.fully_cropped && !boxes.render_box.is_empty() {
            merge(&mut render_box, boxes.render_box);
            merge(&mut pre_crop_render_box, boxes.pre_crop_render_box);
        }
        if let Some(hit) = boxes.hit_test_box {
            merge(&mut hit_test_box, hit);
        }
        stack.extend(scene.children(node));
    }

    let boxes = BoundingBoxes {
        hit_test_box,
        pre_crop_render_box: pre_crop_render_box.unwrap_or(BoundingBox::EMPTY),
        render_box: render_box.unwrap_or(BoundingBox::EMPTY),
        texture_box: BoundingBox::UNIT,
        fully_cropped: false,
    };
    if let Ok(mut union) = scene.world.get::<&mut BoundsWithChildren>(entity) {
        union.store(viewport_id, viewport_revision, boxes);
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::crop::CropSelf;
    use crate::ecs::components::transform::Transform2D;
    use crate::renderer::geometry::CropArea;
    use crate::renderer::viewer::Viewport;
    use crate::settings::SceneSettings;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_hit_test_scale_from_hit_box() {
        // Half-size hit box (independent resolution layer at 2x).
        let hit = BoundingBox::from_rect(0.0, 0.0, 50.0, 25.0);
        let scale = hit_test_crop_scale(&hit, Vec2::new(100.0, 50.0));
        assert!((scale - Vec2::splat(0.5)).length() < EPS);
    }

    #[test]
    fn test_hit_test_scale_zero_size_image() {
        let hit = BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(hit_test_crop_scale(&hit, Vec2::new(0.0, 10.0)), Vec2::ZERO);
    }

    #[test]
    fn test_hit_test_crop_under_zoom_on_independent_layer() {
        let mut scene = Scene::new(SceneSettings::new().virtual_resolution(320.0, 200.0));
        let hd = scene.add_layer(RenderLayer::new(0).independent_resolution(640.0, 400.0));
        let viewport = scene.add_viewport(Viewport::new().scale(2.0, 2.0));
        let e = scene.spawn_image(Transform2D::identity(), Image::new(100.0, 100.0));
        scene.set_drawable(e, Drawable::new().on_layer(hd)).unwrap();
        scene
            .set_crop(e, Some(CropSelf::new(CropArea::new(0.0, 0.0, 50.0, 100.0))))
            .unwrap();

        let boxes = read(&mut scene, e, viewport).unwrap();
        assert!((boxes.render_box.width() - 100.0).abs() < EPS);
        let hit = boxes.hit_test_box.unwrap();
        assert!((hit.width() - 25.0).abs() < EPS);
        assert!((hit.height() - 50.0).abs() < EPS);
    }

    #[test]
    fn test_recompute_counts_once() {
        let mut scene = Scene::new(SceneSettings::default());
        let viewport = scene.add_viewport(Viewport::new());
        let e = scene.spawn_image(Transform2D::from_position(10.0, 20.0), Image::new(100.0, 50.0));

        let first = read(&mut scene, e, viewport).unwrap();
        let second = read(&mut scene, e, viewport).unwrap();
        assert_eq!(first, second);
        assert_eq!(scene.world.get::<&Bounds>(e).unwrap().recomputations(), 1);
    }

    #[test]
    fn test_missing_image_keeps_last_bundle() {
        let mut scene = Scene::new(SceneSettings::default());
        let viewport = scene.add_viewport(Viewport::new());
        let e = scene.spawn(Transform2D::identity());

        let boxes = read(&mut scene, e, viewport).unwrap();
        assert_eq!(boxes, BoundingBoxes::default());
        assert_eq!(scene.world.get::<&Bounds>(e).unwrap().recomputations(), 0);
        assert!(!scene.world.get::<&Bounds>(e).unwrap().dirty_flags().hit_test);
    }

    #[test]
    fn test_unknown_viewport_is_error() {
        let mut scene = Scene::new(SceneSettings::default());
        let e = scene.spawn(Transform2D::identity());
        let err = read(&mut scene, e, ViewportId::from_raw(42)).unwrap_err();
        assert_eq!(err, SceneError::UnknownViewport(ViewportId::from_raw(42)));
    }
}
