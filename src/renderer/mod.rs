//! Geometry and viewing
//!
//! Bounding boxes, cropping, and the viewport/layer model that maps world
//! coordinates to the screen.

pub mod geometry;
pub mod viewer;

pub use geometry::{BoundingBox, BoundingBoxKind, CropArea, CropInfo, QuadVertex};
pub use viewer::{LayerId, LayerMap, RenderLayer, Viewport, ViewportId, ViewportMatrixCache};
