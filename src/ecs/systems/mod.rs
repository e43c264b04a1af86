//! ECS systems (model matrices, bounding boxes, crop children, lock-step,
//! render order).

pub mod bounds;
pub mod crop;
pub mod lock_step;
pub mod render_order;
pub mod transform;

pub use lock_step::TreeLockStep;
pub use render_order::{compare, display_list, sort_draw_order, RenderOrderKey};
pub use transform::build_model;
