//! Lock-step coordinator.
//!
//! A multi-step change (move, resize, re-layout) is bracketed by lock and
//! unlock so readers keep seeing the pre-lock values and listeners get one
//! notification per component at the end. Locks nest.

use rustc_hash::FxHashMap;

use super::bounds::{ensure_fresh, ensure_union_fresh};
use super::transform::model_matrices;
use crate::ecs::components::bounds::{Bounds, BoundsWithChildren};
use crate::ecs::components::lock::Release;
use crate::ecs::components::rendering::TextLayout;
use crate::ecs::components::transform::ModelMatrix;
use crate::error::{Result, SceneError};
use crate::scene::{Scene, SceneEvent};

pub(crate) fn lock_matrix(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let mut model = scene
        .world
        .get::<&mut ModelMatrix>(entity)
        .map_err(|_| SceneError::NoSuchEntity(entity))?;
    model.lock.acquire();
    Ok(())
}

/// Rebuild the matrix if it changed while locked. Returns whether it did.
pub(crate) fn prepare_matrix_for_unlock(scene: &mut Scene, entity: hecs::Entity) -> Result<bool> {
    let changed = scene
        .world
        .get::<&ModelMatrix>(entity)
        .map_err(|_| SceneError::NoSuchEntity(entity))?
        .lock
        .changed();
    if changed {
        model_matrices(scene, entity);
    }
    Ok(changed)
}

pub(crate) fn unlock_matrix(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let release = scene
        .world
        .get::<&mut ModelMatrix>(entity)
        .map_err(|_| SceneError::NoSuchEntity(entity))?
        .lock
        .release();
    match release {
        Release::Unbalanced => Err(SceneError::UnbalancedUnlock(entity)),
        Release::Nested => Ok(()),
        Release::Final { changed } => {
            if changed {
                scene.events.push(SceneEvent::MatrixChanged(entity));
            }
            Ok(())
        }
    }
}

/// Take a box lock. The outermost lock refreshes and snapshots every
/// viewport the entity has boxes for.
pub(crate) fn lock_bounds(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let (outermost, viewports) = {
        let mut bounds = scene
            .world
            .get::<&mut Bounds>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        (bounds.lock.acquire(), bounds.cached_viewports())
    };
    if !outermost {
        return Ok(());
    }

    let mut snapshot = FxHashMap::default();
    for viewport_id in viewports {
        if let Ok(revision) = scene.viewport_revision(viewport_id) {
            snapshot.insert(viewport_id, ensure_fresh(scene, entity, viewport_id, revision));
        }
    }
    if let Ok(mut bounds) = scene.world.get::<&mut Bounds>(entity) {
        bounds.lock.set_snapshot(snapshot);
    }
    Ok(())
}

/// Recompute the snapshotted viewports if anything changed while locked.
/// Never emits events.
pub(crate) fn prepare_bounds_for_unlock(scene: &mut Scene, entity: hecs::Entity) -> Result<bool> {
    let (changed, viewports) = {
        let bounds = scene
            .world
            .get::<&Bounds>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        let viewports: Vec<_> = bounds
            .lock
            .snapshot()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default();
        (bounds.lock.changed(), viewports)
    };
    if changed {
        for viewport_id in viewports {
            if let Ok(revision) = scene.viewport_revision(viewport_id) {
                ensure_fresh(scene, entity, viewport_id, revision);
            }
        }
    }
    Ok(changed)
}

pub(crate) fn unlock_bounds(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let release = {
        let mut bounds = scene
            .world
            .get::<&mut Bounds>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        let release = bounds.lock.release();
        if release == (Release::Final { changed: true }) {
            bounds.notified = true;
        }
        release
    };
    match release {
        Release::Unbalanced => Err(SceneError::UnbalancedUnlock(entity)),
        Release::Nested => Ok(()),
        Release::Final { changed } => {
            if changed {
                scene.events.push(SceneEvent::BoundingBoxesChanged(entity));
            }
            Ok(())
        }
    }
}

pub(crate) fn lock_bounds_with_children(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let (outermost, viewports) = {
        let mut union = scene
            .world
            .get::<&mut BoundsWithChildren>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        (union.lock.acquire(), union.cached_viewports())
    };
    if !outermost {
        return Ok(());
    }

    let mut snapshot = FxHashMap::default();
    for viewport_id in viewports {
        if let Ok(revision) = scene.viewport_revision(viewport_id) {
            snapshot.insert(viewport_id, ensure_union_fresh(scene, entity, viewport_id, revision));
        }
    }
    if let Ok(mut union) = scene.world.get::<&mut BoundsWithChildren>(entity) {
        union.lock.set_snapshot(snapshot);
    }
    Ok(())
}

pub(crate) fn prepare_bounds_with_children_for_unlock(scene: &mut Scene, entity: hecs::Entity) -> Result<bool> {
    let (changed, viewports) = {
        let union = scene
            .world
            .get::<&BoundsWithChildren>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        let viewports: Vec<_> = union
            .lock
            .snapshot()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default();
        (union.lock.changed(), viewports)
    };
    if changed {
        for viewport_id in viewports {
            if let Ok(revision) = scene.viewport_revision(viewport_id) {
                ensure_union_fresh(scene, entity, viewport_id, revision);
            }
        }
    }
    Ok(changed)
}

pub(crate) fn unlock_bounds_with_children(scene: &mut Scene, entity: hecs::Entity) -> Result<()> {
    let release = {
        let mut union = scene
            .world
            .get::<&mut BoundsWithChildren>(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        let release = union.lock.release();
        if release == (Release::Final { changed: true }) {
            union.notified = true;
        }
        release
    };
    match release {
        Release::Unbalanced => Err(SceneError::UnbalancedUnlock(entity)),
        Release::Nested => Ok(()),
        Release::Final { changed } => {
            if changed {
                scene.events.push(SceneEvent::BoundsWithChildrenChanged(entity));
            }
            Ok(())
        }
    }
}

/// A lock held on every lockable component of a subtree.
///
/// Unlocking prepares all levels first, in the order matrices, text layout,
/// boxes, boxes with children, then releases them in the same order.
#[derive(Debug)]
#[must_use = "the subtree stays locked until `unlock` is called"]
pub struct TreeLockStep {
    entities: Vec<hecs::Entity>,
}

impl TreeLockStep {
    /// Lock `root` and all of its descendants.
    pub fn lock(scene: &mut Scene, root: hecs::Entity) -> Result<Self> {
        if !scene.world.contains(root) {
            return Err(SceneError::NoSuchEntity(root));
        }
        let entities = scene.subtree(root);

        for &entity in &entities {
            lock_matrix(scene, entity)?;
        }
        for &entity in &entities {
            if let Ok(mut text) = scene.world.get::<&mut TextLayout>(entity) {
                text.0.lock();
            }
        }
        for &entity in &entities {
            lock_bounds(scene, entity)?;
        }
        for &entity in &entities {
            if scene.world.satisfies::<&BoundsWithChildren>(entity).unwrap_or(false) {
                lock_bounds_with_children(scene, entity)?;
            }
        }
        tracing::trace!(?root, count = entities.len(), "locked subtree");
        Ok(Self { entities })
    }

    /// Entities covered by this lock, root first.
    pub fn entities(&self) -> &[hecs::Entity] {
        &self.entities
    }

    /// Prepare and release every lock. Entities despawned meanwhile are
    /// skipped.
    pub fn unlock(self, scene: &mut Scene) -> Result<()> {
        let alive: Vec<_> = self
            .entities
            .into_iter()
            .filter(|e| scene.world.contains(*e))
            .collect();
        let has_union =
            |scene: &Scene, e: hecs::Entity| scene.world.satisfies::<&BoundsWithChildren>(e).unwrap_or(false);

        for &entity in &alive {
            prepare_matrix_for_unlock(scene, entity)?;
        }
        for &entity in &alive {
            if let Ok(mut text) = scene.world.get::<&mut TextLayout>(entity) {
                text.0.prepare_for_unlock();
            }
        }
        for &entity in &alive {
            prepare_bounds_for_unlock(scene, entity)?;
        }
        for &entity in &alive {
            if has_union(scene, entity) {
                prepare_bounds_with_children_for_unlock(scene, entity)?;
            }
        }

        for &entity in &alive {
            unlock_matrix(scene, entity)?;
        }
        for &entity in &alive {
            if let Ok(mut text) = scene.world.get::<&mut TextLayout>(entity) {
                text.0.unlock();
            }
        }
        for &entity in &alive {
            unlock_bounds(scene, entity)?;
        }
        for &entity in &alive {
            if has_union(scene, entity) {
                unlock_bounds_with_children(scene, entity)?;
            }
        }
        tracing::trace!(count = alive.len(), "unlocked subtree");
        Ok(())
    }
}
