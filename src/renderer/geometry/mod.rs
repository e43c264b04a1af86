//! Geometry primitives
//!
//! Provides the four-corner bounding box used for hit-testing and rendering,
//! the crop rectangle, and the quad vertex handed to renderers.

pub mod builder;
pub mod crop;

pub use builder::{build_hit_test_box, build_intermediate_box, build_render_box};
pub use crop::{crop, CropInfo};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

/// Which box a crop is applied to.
///
/// Only render boxes produce a texture box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundingBoxKind {
    /// Virtual-resolution box used for point queries.
    HitTest,
    /// Viewport-space box used for drawing.
    Render,
}

/// A quad given by its four corners. Y points up.
///
/// Not axis-aligned in general: rotation and skew are preserved. The derived
/// extents (`min_x`, `width`, ...) describe the axis-aligned hull.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
    pub top_left: Vec2,
    pub top_right: Vec2,
}

impl BoundingBox {
    /// All four corners at the origin.
    pub const EMPTY: Self = Self {
        bottom_left: Vec2::ZERO,
        bottom_right: Vec2::ZERO,
        top_left: Vec2::ZERO,
        top_right: Vec2::ZERO,
    };

    /// The full `[0,1]×[0,1]` texture quad.
    pub const UNIT: Self = Self {
        bottom_left: Vec2::new(0.0, 0.0),
        bottom_right: Vec2::new(1.0, 0.0),
        top_left: Vec2::new(0.0, 1.0),
        top_right: Vec2::new(1.0, 1.0),
    };

    /// Create a box from its corners.
    pub const fn new(bottom_left: Vec2, bottom_right: Vec2, top_left: Vec2, top_right: Vec2) -> Self {
        Self {
            bottom_left,
            bottom_right,
            top_left,
            top_right,
        }
    }

    /// Create an axis-aligned box from its bottom-left corner and size.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(
            Vec2::new(x, y),
            Vec2::new(x + width, y),
            Vec2::new(x, y + height),
            Vec2::new(x + width, y + height),
        )
    }

    /// Corners in bl, br, tl, tr order.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.bottom_left,
            self.bottom_right,
            self.top_left,
            self.top_right,
        ]
    }

    pub fn min_x(&self) -> f32 {
        self.corners().iter().fold(f32::MAX, |m, c| m.min(c.x))
    }

    pub fn max_x(&self) -> f32 {
        self.corners().iter().fold(f32::MIN, |m, c| m.max(c.x))
    }

    pub fn min_y(&self) -> f32 {
        self.corners().iter().fold(f32::MAX, |m, c| m.min(c.y))
    }

    pub fn max_y(&self) -> f32 {
        self.corners().iter().fold(f32::MIN, |m, c| m.max(c.y))
    }

    /// Width of the axis-aligned hull.
    pub fn width(&self) -> f32 {
        self.max_x() - self.min_x()
    }

    /// Height of the axis-aligned hull.
    pub fn height(&self) -> f32 {
        self.max_y() - self.min_y()
    }

    /// Get the center of the box.
    pub fn center(&self) -> Vec2 {
        (self.bottom_left + self.bottom_right + self.top_left + self.top_right) * 0.25
    }

    /// Lengths of the bottom edge and the left edge.
    ///
    /// Unlike `width`/`height` these do not grow under rotation.
    pub fn edge_lengths(&self) -> Vec2 {
        Vec2::new(
            (self.bottom_right - self.bottom_left).length(),
            (self.top_left - self.bottom_left).length(),
        )
    }

    /// True when the box covers no area.
    pub fn is_empty(&self) -> bool {
        let lengths = self.edge_lengths();
        lengths.x <= f32::EPSILON || lengths.y <= f32::EPSILON
    }

    /// Check if a point lies inside the quad (edges included).
    ///
    /// Works for rotated and mirrored boxes: the point must be on the same
    /// side of all four edges walked in order.
    pub fn contains(&self, point: Vec2) -> bool {
        if self.is_empty() {
            return false;
        }
        let ring = [
            self.bottom_left,
            self.bottom_right,
            self.top_right,
            self.top_left,
        ];
        let mut positive = false;
        let mut negative = false;
        for i in 0..4 {
            let a = ring[i];
            let b = ring[(i + 1) % 4];
            let cross = (b - a).perp_dot(point - a);
            if cross > 1e-4 {
                positive = true;
            } else if cross < -1e-4 {
                negative = true;
            }
            if positive && negative {
                return false;
            }
        }
        true
    }

    /// Transform every corner by a matrix.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let apply = |p: Vec2| matrix.transform_point3(p.extend(0.0)).truncate();
        Self::new(
            apply(self.bottom_left),
            apply(self.bottom_right),
            apply(self.top_left),
            apply(self.top_right),
        )
    }

    /// Shift every corner.
    pub fn translate(&self, offset: Vec2) -> Self {
        Self::new(
            self.bottom_left + offset,
            self.bottom_right + offset,
            self.top_left + offset,
            self.top_right + offset,
        )
    }

    /// Axis-aligned hull of this box.
    pub fn axis_aligned(&self) -> Self {
        Self::from_rect(self.min_x(), self.min_y(), self.width(), self.height())
    }

    /// Axis-aligned hull of two boxes.
    pub fn union(&self, other: &BoundingBox) -> Self {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Self::from_rect(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Corner-wise comparison with a tolerance.
    pub fn approx_eq(&self, other: &BoundingBox, eps: f32) -> bool {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .all(|(a, b)| (*a - *b).length() <= eps)
    }
}

/// A rectangle in an entity's local pre-scale pixel space.
///
/// The origin is the entity's local bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropArea {
    /// Create a new crop rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Intersect two rectangles; `None` when they do not overlap.
    pub fn intersect(&self, other: &CropArea) -> Option<CropArea> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            return None;
        }
        Some(CropArea::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Vertex handed to renderers: position in viewport space and texture UV.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub const fn new(position: [f32; 2], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rect_extents() {
        let b = BoundingBox::from_rect(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.min_x(), 10.0);
        assert_eq!(b.max_x(), 110.0);
        assert_eq!(b.min_y(), 20.0);
        assert_eq!(b.max_y(), 70.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 50.0);
        assert_eq!(b.center(), Vec2::new(60.0, 45.0));
    }

    #[test]
    fn test_contains_rotated() {
        // Diamond: a unit square rotated 45 degrees around the origin.
        let m = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let b = BoundingBox::from_rect(0.0, 0.0, 1.0, 1.0).transform(&m);

        assert!(b.contains(Vec2::new(0.0, 0.7)));
        // Inside the hull but outside the diamond.
        assert!(!b.contains(Vec2::new(0.6, 0.2)));
    }

    #[test]
    fn test_contains_edges_and_outside() {
        let b = BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains(Vec2::new(0.0, 5.0)));
        assert!(b.contains(Vec2::new(10.0, 10.0)));
        assert!(!b.contains(Vec2::new(10.5, 5.0)));
        assert!(!BoundingBox::EMPTY.contains(Vec2::ZERO));
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::from_rect(5.0, -5.0, 20.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::from_rect(0.0, -5.0, 25.0, 15.0));
    }

    #[test]
    fn test_crop_area_intersect() {
        let a = CropArea::new(0.0, 0.0, 100.0, 100.0);
        let b = CropArea::new(25.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersect(&b), Some(CropArea::new(25.0, 50.0, 75.0, 50.0)));
        assert_eq!(a.intersect(&CropArea::new(100.0, 0.0, 5.0, 5.0)), None);
    }

    #[test]
    fn test_quad_vertex_is_pod() {
        let v = [QuadVertex::new([1.0, 2.0], [0.0, 1.0])];
        let bytes: &[u8] = bytemuck::cast_slice(&v);
        assert_eq!(bytes.len(), 16);
    }
}
