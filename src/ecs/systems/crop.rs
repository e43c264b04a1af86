//! Crop children synchronisation and container-derived crop areas.

use glam::Vec2;

use super::bounds;
use crate::ecs::components::bounds::BoundingBoxes;
use crate::ecs::components::crop::{CropChildren, CropSelf, CropSource};
use crate::ecs::components::transform::JumpOffset;
use crate::renderer::geometry::{BoundingBox, CropArea};
use crate::renderer::viewer::ViewportId;
use crate::scene::{Change, Scene};

/// Resolve the crop rectangle to apply to an entity's boxes in a viewport.
///
/// Container crops are derived here, right before the box is built, from the
/// container's current render box, ignoring any lock held on it.
pub(crate) fn resolve_crop_area(
    scene: &mut Scene,
    entity: hecs::Entity,
    viewport_id: ViewportId,
    pre_crop_render_box: &BoundingBox,
    scale: Vec2,
) -> Option<CropArea> {
    let crop_self: CropSelf = *scene.world.get::<&CropSelf>(entity).ok()?;
    if !crop_self.enabled {
        return None;
    }
    match crop_self.source {
        CropSource::Own => Some(crop_self.area),
        CropSource::Container(container) => {
            // Live box, even while the container is locked.
            let viewport_revision = match scene.viewport_revision(viewport_id) {
                Ok(revision) => revision,
                Err(err) => {
                    tracing::trace!(?entity, ?container, %err, "crop container unavailable");
                    return None;
                }
            };
            if !scene.world.contains(container) {
                return None;
            }
            let container_boxes = bounds::ensure_fresh(scene, container, viewport_id, viewport_revision);
            let area = container_crop_area(&container_boxes, pre_crop_render_box, scale)?;
            if let Ok(mut current) = scene.world.get::<&mut CropSelf>(entity) {
                current.area = area;
            }
            Some(area)
        }
    }
}

/// Visible part of a descendant's render box inside its container, in the
/// descendant's local pixels.
///
/// The container's box is taken axis-aligned. `None` when the container has
/// no box yet; a zero-sized area when nothing overlaps.
pub(crate) fn container_crop_area(
    container: &BoundingBoxes,
    child: &BoundingBox,
    scale: Vec2,
) -> Option<CropArea> {
    if container.fully_cropped {
        return Some(CropArea::default());
    }
    if container.render_box.is_empty() {
        return None;
    }
    if scale.x <= 0.0 || scale.y <= 0.0 {
        return Some(CropArea::default());
    }

    let clip = container.render_box.axis_aligned();
    let x0 = clip.min_x().max(child.min_x());
    let y0 = clip.min_y().max(child.min_y());
    let x1 = clip.max_x().min(child.max_x());
    let y1 = clip.max_y().min(child.max_y());
    if x1 <= x0 || y1 <= y0 {
        return Some(CropArea::default());
    }

    // Local X runs right to left on a mirrored box.
    let local_x = if child.bottom_right.x < child.bottom_left.x {
        child.max_x() - x1
    } else {
        x0 - child.min_x()
    };
    let local_y = if child.top_left.y < child.bottom_left.y {
        child.max_y() - y1
    } else {
        y0 - child.min_y()
    };

    Some(CropArea::new(
        local_x / scale.x,
        local_y / scale.y,
        (x1 - x0) / scale.x,
        (y1 - y0) / scale.y,
    ))
}

/// Descendants to crop and direct children to scroll.
///
/// Hidden descendants are skipped with their subtrees. Nested containers crop
/// their own subtrees.
fn collect(scene: &Scene, container: hecs::Entity, settings: &CropChildren) -> (Vec<hecs::Entity>, Vec<hecs::Entity>) {
    let mut cropped = Vec::new();
    let mut scrolled = Vec::new();
    let mut stack: Vec<(hecs::Entity, bool)> = scene
        .children(container)
        .into_iter()
        .rev()
        .map(|child| (child, true))
        .collect();

    while let Some((entity, direct)) = stack.pop() {
        if direct {
            scrolled.push(entity);
        }
        if !scene.is_visible_flag(entity) {
            continue;
        }
        if !settings.excluded.contains(&entity) {
            cropped.push(entity);
        }
        if scene.world.satisfies::<&CropChildren>(entity).unwrap_or(false) {
            continue;
        }
        stack.extend(scene.children(entity).into_iter().rev().map(|child| (child, false)));
    }
    (cropped, scrolled)
}

/// Re-apply a container's crop and scroll to its current descendants.
pub(crate) fn sync_crop_children(scene: &mut Scene, container: hecs::Entity) {
    let Ok(settings) = scene.world.get::<&CropChildren>(container).map(|c| (*c).clone()) else {
        return;
    };
    let (cropped, scrolled) = if settings.enabled {
        collect(scene, container, &settings)
    } else {
        (Vec::new(), Vec::new())
    };
    apply(scene, container, &settings, &settings.cropped, &settings.scrolled, &cropped, &scrolled);
    tracing::debug!(?container, cropped = cropped.len(), scrolled = scrolled.len(), "synced crop children");

    if let Ok(mut current) = scene.world.get::<&mut CropChildren>(container) {
        current.cropped = cropped;
        current.scrolled = scrolled;
    }
}

/// Undo everything a removed container applied.
pub(crate) fn release_crop_children(scene: &mut Scene, container: hecs::Entity, settings: &CropChildren) {
    apply(scene, container, settings, &settings.cropped, &settings.scrolled, &[], &[]);
}

/// Move membership from the previous lists to the new ones.
fn apply(
    scene: &mut Scene,
    container: hecs::Entity,
    settings: &CropChildren,
    previous_cropped: &[hecs::Entity],
    previous_scrolled: &[hecs::Entity],
    cropped: &[hecs::Entity],
    scrolled: &[hecs::Entity],
) {
    for &entity in previous_cropped.iter().filter(|e| !cropped.contains(*e)) {
        let owned = scene
            .world
            .get::<&CropSelf>(entity)
            .map(|c| c.is_from(container))
            .unwrap_or(false);
        if owned {
            let _ = scene.world.remove_one::<CropSelf>(entity);
            scene.invalidate_bounds(entity, Change::Crop);
        }
    }

    for &entity in cropped {
        // An enabled crop of the entity's own wins over the container's.
        let keep = scene
            .world
            .get::<&CropSelf>(entity)
            .map(|c| c.enabled && (c.source == CropSource::Own || c.is_from(container)))
            .unwrap_or(false);
        if !keep && scene.world.insert_one(entity, CropSelf::from_container(container)).is_ok() {
            scene.invalidate_bounds(entity, Change::Crop);
        }
    }

    for &entity in previous_scrolled.iter().filter(|e| !scrolled.contains(*e)) {
        set_jump_offset(scene, entity, Vec2::ZERO);
    }
    let offset = -settings.start_point;
    for &entity in scrolled {
        set_jump_offset(scene, entity, offset);
    }
}

fn set_jump_offset(scene: &mut Scene, entity: hecs::Entity, offset: Vec2) {
    let current = scene
        .world
        .get::<&JumpOffset>(entity)
        .map(|j| j.0)
        .unwrap_or(Vec2::ZERO);
    if current == offset {
        return;
    }
    let updated = if offset == Vec2::ZERO {
        scene.world.remove_one::<JumpOffset>(entity).is_ok()
    } else {
        scene.world.insert_one(entity, JumpOffset(offset)).is_ok()
    };
    if updated {
        scene.invalidate_matrix(entity);
    }
}
