//! rein2d
//!
//! Geometry core of a 2D scene graph: model matrices, per-viewport bounding
//! boxes, cropping, lock-step batching and draw order, built on hecs.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **renderer** - Pure geometry (boxes, crop math) and viewports/layers
//! 2. **ecs** - hecs components and the systems that compute from them
//! 3. **scene** - `Scene`, the single entry point for mutations and reads
//!
//! # Example
//!
//! ```
//! use rein2d::prelude::*;
//!
//! let mut scene = Scene::new(SceneSettings::new().virtual_resolution(320.0, 200.0));
//! let viewport = scene.add_viewport(Viewport::new());
//! let sprite = scene.spawn_image(Transform2D::from_position(10.0, 20.0), Image::new(100.0, 50.0));
//!
//! let boxes = scene.bounding_boxes(sprite, viewport).unwrap();
//! assert_eq!(boxes.render_box.top_right, Vec2::new(110.0, 70.0));
//! ```

pub mod ecs;
pub mod error;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use error::{Result, SceneError};
pub use scene::{Scene, SceneEvent};
pub use settings::SceneSettings;

pub use renderer::{
    BoundingBox, BoundingBoxKind, CropArea, CropInfo, LayerId, QuadVertex, RenderLayer, Viewport,
    ViewportId,
};

pub use ecs::components::{
    BoundingBoxes, BoundsWithChildren, CropChildren, CropSelf, CropSource, Drawable, Image,
    LockStep, ModelMatrices, SpriteFrame, Transform2D, Visible,
};
pub use ecs::systems::TreeLockStep;

// Re-export dependencies for convenience
pub use glam;
pub use hecs;

pub mod prelude {
    pub use crate::ecs::prelude::*;
    pub use crate::error::{Result, SceneError};
    pub use crate::renderer::{
        BoundingBox, BoundingBoxKind, CropArea, CropInfo, LayerId, QuadVertex, RenderLayer,
        Viewport, ViewportId,
    };
    pub use crate::scene::{Scene, SceneEvent};
    pub use crate::settings::SceneSettings;
    pub use glam::{Mat4, Vec2, Vec3};
}
