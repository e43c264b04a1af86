//! Box cropping
//!
//! A crop area is given in the entity's local pre-scale pixels. The box's
//! own edges are used to map it, so rotated and mirrored boxes crop along
//! their local axes.

use glam::Vec2;

use super::{BoundingBox, BoundingBoxKind, CropArea};

/// Result of cropping a box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CropInfo {
    /// Nothing was cropped; use the box as it was.
    #[default]
    Uncropped,
    /// Part of the box remains visible.
    Cropped {
        bounding_box: BoundingBox,
        /// UV quad of the visible part. Only produced for render boxes.
        texture_box: Option<BoundingBox>,
    },
    /// The crop removed the whole box. Callers skip any further geometry or
    /// texture work for the entity this frame.
    FullyCropped,
}

impl CropInfo {
    /// True for [`CropInfo::FullyCropped`].
    pub fn is_fully_cropped(&self) -> bool {
        matches!(self, Self::FullyCropped)
    }

    /// The box to use after cropping `original`.
    pub fn resolve(&self, original: &BoundingBox) -> BoundingBox {
        match self {
            Self::Uncropped => *original,
            Self::Cropped { bounding_box, .. } => *bounding_box,
            Self::FullyCropped => BoundingBox::EMPTY,
        }
    }

    /// The cropped texture quad, if cropping produced one.
    pub fn texture_box(&self) -> Option<BoundingBox> {
        match self {
            Self::Cropped { texture_box, .. } => *texture_box,
            _ => None,
        }
    }
}

/// Crop `bounding_box` to `area`.
///
/// `scale` is the number of box units per local pixel on each axis; the
/// box's local extents are its edge lengths divided by it. `area = None`
/// means cropping is disabled.
pub fn crop(
    bounding_box: &BoundingBox,
    kind: BoundingBoxKind,
    area: Option<&CropArea>,
    scale: Vec2,
) -> CropInfo {
    let Some(area) = area else {
        return CropInfo::Uncropped;
    };
    if scale.x <= 0.0 || scale.y <= 0.0 {
        return CropInfo::FullyCropped;
    }

    let extents = bounding_box.edge_lengths() / scale;
    if extents.x <= f32::EPSILON || extents.y <= f32::EPSILON {
        return CropInfo::FullyCropped;
    }

    let full = CropArea::new(0.0, 0.0, extents.x, extents.y);
    let Some(visible) = full.intersect(area) else {
        return CropInfo::FullyCropped;
    };

    let u0 = visible.x / extents.x;
    let v0 = visible.y / extents.y;
    let u1 = visible.max_x() / extents.x;
    let v1 = visible.max_y() / extents.y;

    const EPS: f32 = 1e-5;
    if u0 <= EPS && v0 <= EPS && u1 >= 1.0 - EPS && v1 >= 1.0 - EPS {
        return CropInfo::Uncropped;
    }

    let at = |u: f32, v: f32| {
        bounding_box.bottom_left * ((1.0 - u) * (1.0 - v))
            + bounding_box.bottom_right * (u * (1.0 - v))
            + bounding_box.top_left * ((1.0 - u) * v)
            + bounding_box.top_right * (u * v)
    };

    let cropped = BoundingBox::new(at(u0, v0), at(u1, v0), at(u0, v1), at(u1, v1));
    let texture_box = match kind {
        BoundingBoxKind::Render => Some(BoundingBox::new(
            Vec2::new(u0, v0),
            Vec2::new(u1, v0),
            Vec2::new(u0, v1),
            Vec2::new(u1, v1),
        )),
        BoundingBoxKind::HitTest => None,
    };

    CropInfo::Cropped {
        bounding_box: cropped,
        texture_box,
    }
}
