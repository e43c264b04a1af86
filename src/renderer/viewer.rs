//! Viewports and render layers
//!
//! A viewport pans, zooms and rotates the scene. A render layer groups
//! entities under one Z, an optional independent resolution and a parallax
//! speed. Each (viewport, layer) pair has its own world-to-screen matrix.

use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use super::geometry::BoundingBox;

/// Stable viewport handle, assigned at registration.
///
/// Two viewports with identical settings are still distinct: caches are keyed
/// by this handle, never by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewportId(u32);

impl ViewportId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Stable render layer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u32);

impl LayerId {
    /// The scene's default layer, always registered.
    pub const DEFAULT: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Registered render layers.
pub type LayerMap = FxHashMap<LayerId, RenderLayer>;

/// A render layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderLayer {
    /// Coarse ordering between layers. Larger values are further back.
    pub z: i32,
    /// Resolution this layer's entities are expressed in, when it differs from
    /// the virtual resolution.
    pub independent_resolution: Option<Vec2>,
    /// Multiplier applied to the viewport pan.
    pub parallax_speed: Vec2,
}

impl RenderLayer {
    /// Create a layer in the virtual resolution with no parallax.
    pub fn new(z: i32) -> Self {
        Self {
            z,
            independent_resolution: None,
            parallax_speed: Vec2::ONE,
        }
    }

    /// Express this layer's geometry in its own resolution.
    ///
    /// # Panics
    /// Panics if either dimension is not strictly positive.
    pub fn independent_resolution(mut self, width: f32, height: f32) -> Self {
        assert!(
            width > 0.0 && height > 0.0,
            "independent resolution must be positive, got {width}x{height}"
        );
        self.independent_resolution = Some(Vec2::new(width, height));
        self
    }

    /// Set the parallax speed.
    pub fn parallax_speed(mut self, x: f32, y: f32) -> Self {
        self.parallax_speed = Vec2::new(x, y);
        self
    }

    /// The resolution entities on this layer are expressed in.
    pub fn resolution(&self, virtual_resolution: Vec2) -> Vec2 {
        self.independent_resolution.unwrap_or(virtual_resolution)
    }

    /// Layer resolution divided by the virtual resolution.
    pub fn resolution_factor(&self, virtual_resolution: Vec2) -> Vec2 {
        self.resolution(virtual_resolution) / virtual_resolution
    }
}

impl Default for RenderLayer {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Viewport settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Horizontal pan in virtual-resolution units.
    pub x: f32,
    /// Vertical pan in virtual-resolution units.
    pub y: f32,
    /// Zoom on each axis.
    pub scale: Vec2,
    /// Rotation in degrees around the pivot.
    pub rotation: f32,
    /// Rotation/zoom pivot as a fraction of the layer resolution.
    pub pivot: Vec2,
    /// Window area this viewport draws into, normalized to `[0,1]`.
    pub projection_box: BoundingBox,
    /// Ordering among viewports.
    pub z: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: Vec2::ONE,
            rotation: 0.0,
            pivot: Vec2::ZERO,
            projection_box: BoundingBox::UNIT,
            z: 0,
        }
    }
}

impl Viewport {
    /// Create a viewport with no pan, zoom or rotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pan.
    pub fn pan(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the zoom.
    pub fn scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Vec2::new(x, y);
        self
    }

    /// Set the rotation in degrees.
    pub fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the rotation/zoom pivot.
    pub fn pivot(mut self, x: f32, y: f32) -> Self {
        self.pivot = Vec2::new(x, y);
        self
    }

    /// Set the normalized window area.
    pub fn projection_box(mut self, projection_box: BoundingBox) -> Self {
        self.projection_box = projection_box;
        self
    }

    /// Set the ordering among viewports.
    pub fn z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    /// True when a change from `previous` moves what this viewport shows.
    pub(crate) fn view_differs(&self, previous: &Viewport) -> bool {
        self.x != previous.x
            || self.y != previous.y
            || self.scale != previous.scale
            || self.rotation != previous.rotation
            || self.pivot != previous.pivot
    }

    /// World-to-screen matrix for a layer.
    pub fn matrix_for(&self, layer: &RenderLayer, virtual_resolution: Vec2) -> Mat4 {
        build_viewport_matrix(&MatrixKey::new(self, layer, virtual_resolution))
    }

    /// Convert a screen point (virtual resolution) to world space on a layer
    /// in the virtual resolution with no parallax.
    pub fn screen_to_world(&self, point: Vec2, virtual_resolution: Vec2) -> Vec2 {
        let matrix = self.matrix_for(&RenderLayer::default(), virtual_resolution);
        matrix
            .inverse()
            .transform_point3(point.extend(0.0))
            .truncate()
    }
}

/// Everything a viewport matrix depends on, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MatrixKey {
    pan: Vec2,
    scale: Vec2,
    rotation: f32,
    pivot: Vec2,
    parallax_speed: Vec2,
    resolution: Vec2,
    resolution_factor: Vec2,
}

impl MatrixKey {
    fn new(viewport: &Viewport, layer: &RenderLayer, virtual_resolution: Vec2) -> Self {
        Self {
            pan: Vec2::new(viewport.x, viewport.y),
            scale: viewport.scale,
            rotation: viewport.rotation,
            pivot: viewport.pivot,
            parallax_speed: layer.parallax_speed,
            resolution: layer.resolution(virtual_resolution),
            resolution_factor: layer.resolution_factor(virtual_resolution),
        }
    }
}

/// Translate by the parallax-adjusted pan, then rotate and scale about the pivot.
fn build_viewport_matrix(key: &MatrixKey) -> Mat4 {
    let pan = key.pan * key.parallax_speed * key.resolution_factor;
    let pivot = (key.pivot * key.resolution).extend(0.0);
    Mat4::from_translation(pivot)
        * Mat4::from_rotation_z(key.rotation.to_radians())
        * Mat4::from_scale(Vec3::new(key.scale.x, key.scale.y, 1.0))
        * Mat4::from_translation(-pivot)
        * Mat4::from_translation(Vec3::new(-pan.x, -pan.y, 0.0))
}

#[derive(Debug, Clone, Copy)]
struct CachedMatrix {
    key: MatrixKey,
    matrix: Mat4,
}

/// Per (viewport, layer) viewport matrix cache.
///
/// A matrix is rebuilt only when one of its inputs changed since the last
/// request for the same pair.
#[derive(Debug, Default)]
pub struct ViewportMatrixCache {
    entries: FxHashMap<(ViewportId, LayerId), CachedMatrix>,
    builds: u64,
}

impl ViewportMatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the world-to-screen matrix for a layer seen through a viewport.
    pub fn get_matrix(
        &mut self,
        viewport_id: ViewportId,
        viewport: &Viewport,
        layer_id: LayerId,
        layer: &RenderLayer,
        virtual_resolution: Vec2,
    ) -> Mat4 {
        let key = MatrixKey::new(viewport, layer, virtual_resolution);
        if let Some(cached) = self.entries.get(&(viewport_id, layer_id)) {
            if cached.key == key {
                return cached.matrix;
            }
        }

        let matrix = build_viewport_matrix(&key);
        self.builds += 1;
        self.entries
            .insert((viewport_id, layer_id), CachedMatrix { key, matrix });
        matrix
    }

    /// Number of matrices built since creation.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Drop every entry of a viewport.
    pub fn forget_viewport(&mut self, viewport_id: ViewportId) {
        self.entries.retain(|(id, _), _| *id != viewport_id);
    }

    /// Drop every entry of a layer.
    pub fn forget_layer(&mut self, layer_id: LayerId) {
        self.entries.retain(|(_, id), _| *id != layer_id);
    }
}
