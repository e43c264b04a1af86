//! Transform components for ECS entities.

use glam::{Mat4, Vec2, Vec3};

use super::lock::LockState;

/// Local-space 2D transform.
///
/// `position.z` only orders drawing; it never enters the model matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub position: Vec3,
    pub scale: Vec2,
    /// Rotation in degrees, counter-clockwise.
    pub rotation: f32,
    /// Anchor as a fraction of the base size; (0,0) is the bottom-left corner.
    pub pivot: Vec2,
}

impl Transform2D {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            pivot: Vec2::ZERO,
        }
    }

    /// Create a transform from a 2D position.
    pub fn from_position(x: f32, y: f32) -> Self {
        Self {
            position: Vec3::new(x, y, 0.0),
            ..Self::identity()
        }
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.position.z = z;
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Vec2::new(x, y);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_pivot(mut self, x: f32, y: f32) -> Self {
        self.pivot = Vec2::new(x, y);
        self
    }

    /// Width and height after scaling a base size.
    pub fn scaled_size(&self, base_size: Vec2) -> Vec2 {
        base_size * self.scale
    }

    /// Local matrix: move the pivot to the origin, scale, rotate, translate.
    pub fn to_matrix(&self, base_size: Vec2, jump_offset: Vec2) -> Mat4 {
        let anchor = (self.pivot * base_size).extend(0.0);
        let translation = Vec3::new(
            self.position.x + jump_offset.x,
            self.position.y + jump_offset.y,
            0.0,
        );
        Mat4::from_translation(translation)
            * Mat4::from_rotation_z(self.rotation.to_radians())
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::from_translation(-anchor)
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Reference to a parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub hecs::Entity);

/// List of child entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<hecs::Entity>);

/// Extra translation applied on top of the position, used by scrolling
/// containers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpOffset(pub Vec2);

/// World model matrices of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMatrices {
    /// In the entity's own resolution (its layer's independent resolution,
    /// or the virtual resolution).
    pub in_object_resolution: Mat4,
    /// Rescaled into the virtual resolution. Hit-testing uses this one.
    pub in_virtual_resolution: Mat4,
}

impl Default for ModelMatrices {
    fn default() -> Self {
        Self {
            in_object_resolution: Mat4::IDENTITY,
            in_virtual_resolution: Mat4::IDENTITY,
        }
    }
}

/// Cached model matrices. Rebuilt lazily after invalidation.
#[derive(Debug)]
pub struct ModelMatrix {
    pub(crate) matrices: Option<ModelMatrices>,
    pub(crate) dirty: bool,
    pub(crate) lock: LockState<()>,
}

impl Default for ModelMatrix {
    fn default() -> Self {
        Self {
            matrices: None,
            dirty: true,
            lock: LockState::default(),
        }
    }
}

impl ModelMatrix {
    /// True when the next read rebuilds the matrices.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The last built matrices, possibly stale.
    pub fn cached(&self) -> Option<ModelMatrices> {
        self.matrices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: Mat4, x: f32, y: f32) -> Vec2 {
        m.transform_point3(Vec3::new(x, y, 0.0)).truncate()
    }

    #[test]
    fn test_identity() {
        let t = Transform2D::identity();
        assert_eq!(t.to_matrix(Vec2::new(10.0, 10.0), Vec2::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn test_default_is_identity() {
        let t = Transform2D::default();
        assert_eq!(t.to_matrix(Vec2::ZERO, Vec2::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn test_pivot_anchors() {
        let t = Transform2D::from_position(50.0, 50.0).with_pivot(0.5, 0.5);
        let m = t.to_matrix(Vec2::new(20.0, 10.0), Vec2::ZERO);
        // Pivot lands on the position.
        assert_eq!(apply(m, 10.0, 5.0), Vec2::new(50.0, 50.0));
        assert_eq!(apply(m, 0.0, 0.0), Vec2::new(40.0, 45.0));
    }

    #[test]
    fn test_scale_then_rotate() {
        let t = Transform2D::identity().with_scale(2.0, 1.0).with_rotation(90.0);
        let m = t.to_matrix(Vec2::new(10.0, 10.0), Vec2::ZERO);
        let p = apply(m, 1.0, 0.0);
        assert!((p - Vec2::new(0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_jump_offset_translates() {
        let t = Transform2D::from_position(1.0, 2.0);
        let m = t.to_matrix(Vec2::ZERO, Vec2::new(0.0, -10.0));
        assert_eq!(apply(m, 0.0, 0.0), Vec2::new(1.0, -8.0));
    }

    #[test]
    fn test_z_not_in_matrix() {
        let t = Transform2D::from_position(3.0, 4.0).with_z(99.0);
        let m = t.to_matrix(Vec2::ZERO, Vec2::ZERO);
        assert_eq!(m.w_axis.z, 0.0);
    }

    #[test]
    fn test_scaled_size() {
        let t = Transform2D::identity().with_scale(2.0, 0.5);
        assert_eq!(t.scaled_size(Vec2::new(100.0, 40.0)), Vec2::new(200.0, 20.0));
    }
}
