//! Entity Component System integration with hecs.

pub mod components;
pub mod systems;

pub mod prelude {
    pub use super::components::*;
    pub use super::systems::{build_model, compare, display_list, sort_draw_order, TreeLockStep};
}
