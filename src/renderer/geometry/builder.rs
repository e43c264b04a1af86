//! Bounding box construction
//!
//! Pure functions turning a size and a model matrix into boxes. No entity
//! state is read here.

use glam::{Mat4, Vec2};

use super::BoundingBox;

/// Transform the corners of `[0,width]×[0,height]` by a model matrix.
///
/// Corners keep their local identity: `bottom_left` is the image of the local
/// origin even if the transform mirrors the quad.
pub fn build_intermediate_box(width: f32, height: f32, model: &Mat4) -> BoundingBox {
    BoundingBox::from_rect(0.0, 0.0, width, height).transform(model)
}

/// Re-order an intermediate box so each corner is where its name says.
///
/// Rotation past 90 degrees and negative scale can move the image of the
/// local origin anywhere. The box is flipped on X when the transformed
/// bottom-right lies left of the transformed bottom-left, and on Y when the
/// transformed top-left lies below it.
pub fn build_hit_test_box(intermediate: &BoundingBox) -> BoundingBox {
    let BoundingBox {
        bottom_left: bl,
        bottom_right: br,
        top_left: tl,
        top_right: tr,
    } = *intermediate;

    let flipped_x = br.x < bl.x;
    let flipped_y = tl.y < bl.y;

    match (flipped_x, flipped_y) {
        (false, false) => BoundingBox::new(bl, br, tl, tr),
        (true, false) => BoundingBox::new(br, bl, tr, tl),
        (false, true) => BoundingBox::new(tl, tr, bl, br),
        (true, true) => BoundingBox::new(tr, tl, br, bl),
    }
}

/// Apply a viewport matrix on top of an intermediate box.
///
/// Returns the box and the scale the viewport matrix applied on each axis.
pub fn build_render_box(intermediate: &BoundingBox, viewport_matrix: &Mat4) -> (BoundingBox, Vec2) {
    let scale = Vec2::new(
        viewport_matrix.x_axis.truncate().length(),
        viewport_matrix.y_axis.truncate().length(),
    );
    (intermediate.transform(viewport_matrix), scale)
}
