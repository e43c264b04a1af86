//! ECS components (transform, rendering, bounds, crop, lock state).

pub mod bounds;
pub mod crop;
pub mod lock;
pub mod rendering;
pub mod transform;

pub use bounds::*;
pub use crop::*;
pub use lock::{LockState, LockStep};
pub use rendering::*;
pub use transform::*;
