//! Bounding box cache components.

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};

use super::lock::LockState;
use crate::renderer::geometry::{BoundingBox, QuadVertex};
use crate::renderer::viewer::ViewportId;

/// Every box computed for one entity in one viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBoxes {
    /// Virtual-resolution box for point queries. `None` marks the entity as
    /// non-interactive (never computed, or fully cropped).
    pub hit_test_box: Option<BoundingBox>,
    /// Viewport-space box before cropping.
    pub pre_crop_render_box: BoundingBox,
    /// Viewport-space box after cropping.
    pub render_box: BoundingBox,
    /// UV quad to sample.
    pub texture_box: BoundingBox,
    /// The crop removed everything; nothing should be drawn.
    pub fully_cropped: bool,
}

impl Default for BoundingBoxes {
    fn default() -> Self {
        Self {
            hit_test_box: None,
            pre_crop_render_box: BoundingBox::EMPTY,
            render_box: BoundingBox::EMPTY,
            texture_box: BoundingBox::UNIT,
            fully_cropped: false,
        }
    }
}

impl BoundingBoxes {
    /// Check if a virtual-resolution point hits this entity.
    pub fn hits(&self, point: Vec2) -> bool {
        self.hit_test_box.is_some_and(|b| b.contains(point))
    }

    /// The render quad paired with its UVs, in bl, br, tl, tr order.
    pub fn quad_vertices(&self) -> [QuadVertex; 4] {
        let positions = self.render_box.corners();
        let uvs = self.texture_box.corners();
        std::array::from_fn(|i| QuadVertex::new(positions[i].to_array(), uvs[i].to_array()))
    }
}

/// Freshness of one cached viewport entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Clean,
    Stale(Staleness),
}

/// What made a viewport entry stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Image, matrix, layer or crop changed.
    Geometry,
    /// A per-viewport input of the entity changed, such as its texture offset.
    Appearance,
    /// Only the viewport moved.
    Viewport,
}

/// Revision counters an entry was built at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Revisions {
    pub geometry: u64,
    pub viewports: u64,
    pub viewport: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ViewportEntry {
    pub boxes: BoundingBoxes,
    pub built_at: Option<Revisions>,
}

/// Which inputs changed since the last recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlags {
    pub hit_test: bool,
    pub crop: bool,
    pub viewports: bool,
}

/// Per-entity bounding box cache.
#[derive(Debug)]
pub struct Bounds {
    pub(crate) hit_test_dirty: bool,
    pub(crate) crop_dirty: bool,
    pub(crate) viewports_dirty: bool,
    pub(crate) geometry_revision: u64,
    pub(crate) viewports_revision: u64,
    pub(crate) hit_test_intermediate: BoundingBox,
    pub(crate) hit_test_box: BoundingBox,
    pub(crate) entries: FxHashMap<ViewportId, ViewportEntry>,
    /// A change event is outstanding and has not been followed by a read.
    pub(crate) notified: bool,
    pub(crate) lock: LockState<FxHashMap<ViewportId, BoundingBoxes>>,
    pub(crate) recomputations: u64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            hit_test_dirty: true,
            crop_dirty: false,
            viewports_dirty: false,
            geometry_revision: 1,
            viewports_revision: 0,
            hit_test_intermediate: BoundingBox::EMPTY,
            hit_test_box: BoundingBox::EMPTY,
            entries: FxHashMap::default(),
            notified: false,
            lock: LockState::default(),
            recomputations: 0,
        }
    }
}

impl Bounds {
    pub(crate) fn mark_hit_test_dirty(&mut self) {
        self.hit_test_dirty = true;
        self.geometry_revision += 1;
    }

    pub(crate) fn mark_crop_dirty(&mut self) {
        self.crop_dirty = true;
        self.geometry_revision += 1;
    }

    pub(crate) fn mark_viewports_dirty(&mut self) {
        self.viewports_dirty = true;
        self.viewports_revision += 1;
    }

    pub(crate) fn current_revisions(&self, viewport_revision: u64) -> Revisions {
        Revisions {
            geometry: self.geometry_revision,
            viewports: self.viewports_revision,
            viewport: viewport_revision,
        }
    }

    /// Freshness of the entry for a viewport at its current revision.
    pub fn freshness(&self, viewport_id: ViewportId, viewport_revision: u64) -> Freshness {
        let Some(built) = self.entries.get(&viewport_id).and_then(|e| e.built_at) else {
            return Freshness::Stale(Staleness::Geometry);
        };
        if built.geometry != self.geometry_revision {
            Freshness::Stale(Staleness::Geometry)
        } else if built.viewports != self.viewports_revision {
            Freshness::Stale(Staleness::Appearance)
        } else if built.viewport != viewport_revision {
            Freshness::Stale(Staleness::Viewport)
        } else {
            Freshness::Clean
        }
    }

    /// Mark an entry as current without recomputing it.
    pub(crate) fn mark_clean(&mut self, viewport_id: ViewportId, viewport_revision: u64) -> BoundingBoxes {
        let revisions = self.current_revisions(viewport_revision);
        let entry = self.entries.entry(viewport_id).or_default();
        entry.built_at = Some(revisions);
        self.notified = false;
        entry.boxes
    }

    pub(crate) fn store(&mut self, viewport_id: ViewportId, viewport_revision: u64, boxes: BoundingBoxes) {
        let revisions = self.current_revisions(viewport_revision);
        self.entries.insert(
            viewport_id,
            ViewportEntry {
                boxes,
                built_at: Some(revisions),
            },
        );
        self.crop_dirty = false;
        self.viewports_dirty = false;
        self.notified = false;
        self.recomputations += 1;
    }

    /// The last bundle computed for a viewport, possibly stale.
    pub fn cached(&self, viewport_id: ViewportId) -> Option<BoundingBoxes> {
        self.entries.get(&viewport_id).map(|e| e.boxes)
    }

    pub(crate) fn cached_viewports(&self) -> Vec<ViewportId> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn forget_viewport(&mut self, viewport_id: ViewportId) {
        self.entries.remove(&viewport_id);
    }

    pub fn dirty_flags(&self) -> DirtyFlags {
        DirtyFlags {
            hit_test: self.hit_test_dirty,
            crop: self.crop_dirty,
            viewports: self.viewports_dirty,
        }
    }

    /// Number of bundles built since the entity was spawned.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct UnionEntry {
    pub boxes: BoundingBoxes,
    pub revision: u64,
    pub viewport_revision: u64,
}

/// Union of an entity's boxes with those of its visible descendants.
#[derive(Debug, Default)]
pub struct BoundsWithChildren {
    /// Descendants left out of the union, with their subtrees.
    pub excluded: FxHashSet<hecs::Entity>,
    pub(crate) revision: u64,
    pub(crate) entries: FxHashMap<ViewportId, UnionEntry>,
    pub(crate) notified: bool,
    pub(crate) lock: LockState<FxHashMap<ViewportId, BoundingBoxes>>,
}

impl BoundsWithChildren {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding(mut self, entity: hecs::Entity) -> Self {
        self.excluded.insert(entity);
        self
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn fresh(&self, viewport_id: ViewportId, viewport_revision: u64) -> Option<BoundingBoxes> {
        self.entries
            .get(&viewport_id)
            .filter(|e| e.revision == self.revision && e.viewport_revision == viewport_revision)
            .map(|e| e.boxes)
    }

    pub(crate) fn store(&mut self, viewport_id: ViewportId, viewport_revision: u64, boxes: BoundingBoxes) {
        self.entries.insert(
            viewport_id,
            UnionEntry {
                boxes,
                revision: self.revision,
                viewport_revision,
            },
        );
        self.notified = false;
    }

    pub(crate) fn cached_viewports(&self) -> Vec<ViewportId> {
        self.entries.keys().copied().collect()
    }
}
