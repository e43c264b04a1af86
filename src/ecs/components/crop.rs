//! Crop components.

use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::renderer::geometry::CropArea;

/// Where a crop rectangle comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropSource {
    /// Set directly on the entity.
    #[default]
    Own,
    /// Derived from a crop-children container each time the box is built.
    Container(hecs::Entity),
}

/// Crop applied to the entity's own boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSelf {
    pub enabled: bool,
    /// In local pre-scale pixels. For container crops this holds the last
    /// derived rectangle.
    pub area: CropArea,
    pub source: CropSource,
}

impl CropSelf {
    pub fn new(area: CropArea) -> Self {
        Self {
            enabled: true,
            area,
            source: CropSource::Own,
        }
    }

    pub(crate) fn from_container(container: hecs::Entity) -> Self {
        Self {
            enabled: true,
            area: CropArea::default(),
            source: CropSource::Container(container),
        }
    }

    pub fn is_from(&self, container: hecs::Entity) -> bool {
        self.source == CropSource::Container(container)
    }
}

/// Clips every visible descendant to this entity's render box and scrolls
/// direct children by `start_point`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropChildren {
    pub enabled: bool,
    /// Scroll position; direct children move by its negation.
    pub start_point: Vec2,
    /// Descendants left uncropped. They still scroll.
    pub excluded: FxHashSet<hecs::Entity>,
    pub(crate) cropped: Vec<hecs::Entity>,
    pub(crate) scrolled: Vec<hecs::Entity>,
}

impl Default for CropChildren {
    fn default() -> Self {
        Self {
            enabled: true,
            start_point: Vec2::ZERO,
            excluded: FxHashSet::default(),
            cropped: Vec::new(),
            scrolled: Vec::new(),
        }
    }
}

impl CropChildren {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_point(mut self, x: f32, y: f32) -> Self {
        self.start_point = Vec2::new(x, y);
        self
    }

    pub fn excluding(mut self, entity: hecs::Entity) -> Self {
        self.excluded.insert(entity);
        self
    }

    /// Descendants currently cropped by this container.
    pub fn cropped(&self) -> &[hecs::Entity] {
        &self.cropped
    }
}
