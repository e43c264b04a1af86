//! Rendering-related components.

use glam::{Mat4, Vec2, Vec3};

use super::lock::LockStep;
use crate::renderer::viewer::LayerId;

/// Base size of the current image, in the entity's resolution.
///
/// Entities without an image are "not ready": their boxes keep the last
/// computed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Image {
    pub width: f32,
    pub height: f32,
}

impl Image {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// The current animation frame's own placement, applied inside the entity
/// transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteFrame {
    pub pivot: Vec2,
    pub scale: Vec2,
    /// Degrees, counter-clockwise.
    pub rotation: f32,
    pub offset: Vec2,
    /// Added to the entity's Z when ordering.
    pub z: f32,
}

impl Default for SpriteFrame {
    fn default() -> Self {
        Self {
            pivot: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            offset: Vec2::ZERO,
            z: 0.0,
        }
    }
}

impl SpriteFrame {
    pub fn with_pivot(mut self, x: f32, y: f32) -> Self {
        self.pivot = Vec2::new(x, y);
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

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Vec2::new(x, y);
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    /// Frame matrix: rotate and scale about the frame pivot, then offset.
    pub fn to_matrix(&self, base_size: Vec2) -> Mat4 {
        let anchor = (self.pivot * base_size).extend(0.0);
        Mat4::from_translation(self.offset.extend(0.0) + anchor)
            * Mat4::from_rotation_z(self.rotation.to_radians())
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::from_translation(-anchor)
    }
}

/// How an entity is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drawable {
    /// Explicit layer. `None` inherits from the closest ancestor that has one.
    pub render_layer: Option<LayerId>,
    /// Draw in screen space, unaffected by viewport pan and zoom.
    pub ignore_viewport: bool,
    /// UV shift applied to the texture box.
    pub texture_offset: Vec2,
}

impl Drawable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_layer(mut self, layer: LayerId) -> Self {
        self.render_layer = Some(layer);
        self
    }

    pub fn ignoring_viewport(mut self) -> Self {
        self.ignore_viewport = true;
        self
    }

    pub fn with_texture_offset(mut self, u: f32, v: f32) -> Self {
        self.texture_offset = Vec2::new(u, v);
        self
    }
}

/// Visibility flag. Hidden entities hide their whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}

/// A text layout that joins tree-wide lock-step batches.
pub struct TextLayout(pub Box<dyn LockStep>);

impl std::fmt::Debug for TextLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayout").finish_non_exhaustive()
    }
}
