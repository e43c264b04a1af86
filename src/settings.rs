//! Scene settings
//!
//! Configuration for scene creation.

use glam::Vec2;

use crate::renderer::viewer::RenderLayer;

/// Settings for creating a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone)]
pub struct SceneSettings {
    /// Design resolution all non-layer-independent geometry is expressed in.
    pub virtual_resolution: Vec2,
    /// Layer used by entities whose ancestor chain declares no layer.
    pub default_layer: RenderLayer,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            virtual_resolution: Vec2::new(320.0, 200.0),
            default_layer: RenderLayer::new(0),
        }
    }
}

impl SceneSettings {
    /// Create new scene settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the virtual resolution.
    ///
    /// # Panics
    /// Panics if either dimension is not strictly positive.
    pub fn virtual_resolution(mut self, width: f32, height: f32) -> Self {
        assert!(
            width > 0.0 && height > 0.0,
            "virtual resolution must be positive, got {width}x{height}"
        );
        self.virtual_resolution = Vec2::new(width, height);
        self
    }

    /// Set the default render layer.
    pub fn default_layer(mut self, layer: RenderLayer) -> Self {
        self.default_layer = layer;
        self
    }
}
