//! Model matrix builder.
//!
//! Walks the `Parent` chain and folds every ancestor's local matrix into the
//! entity's, converting ancestors that live in another resolution.

use glam::{Mat4, Vec2};

use crate::ecs::components::rendering::{Drawable, Image, SpriteFrame};
use crate::ecs::components::transform::{JumpOffset, ModelMatrices, ModelMatrix, Parent, Transform2D};
use crate::renderer::viewer::{LayerId, LayerMap};
use crate::scene::Scene;
use crate::settings::SceneSettings;

/// Get an entity's parent, if any.
pub fn parent_of(world: &hecs::World, entity: hecs::Entity) -> Option<hecs::Entity> {
    world.get::<&Parent>(entity).ok().map(|p| p.0)
}

/// Layer an entity draws on: its own, else the closest ancestor's, else the
/// default layer.
pub fn effective_layer(world: &hecs::World, entity: hecs::Entity) -> LayerId {
    let mut current = Some(entity);
    while let Some(e) = current {
        if let Some(layer) = world.get::<&Drawable>(e).ok().and_then(|d| d.render_layer) {
            return layer;
        }
        current = parent_of(world, e);
    }
    LayerId::DEFAULT
}

/// Resolution an entity's coordinates are expressed in.
fn object_resolution(
    world: &hecs::World,
    entity: hecs::Entity,
    layers: &LayerMap,
    virtual_resolution: Vec2,
) -> Option<Vec2> {
    layers
        .get(&effective_layer(world, entity))
        .map(|layer| layer.resolution(virtual_resolution))
}

/// Entity matrix combined with the current sprite frame.
pub fn local_matrix(world: &hecs::World, entity: hecs::Entity) -> Option<Mat4> {
    let transform: Transform2D = *world.get::<&Transform2D>(entity).ok()?;
    let base_size = world
        .get::<&Image>(entity)
        .map(|image| image.size())
        .unwrap_or(Vec2::ZERO);
    let jump = world
        .get::<&JumpOffset>(entity)
        .map(|j| j.0)
        .unwrap_or(Vec2::ZERO);

    let matrix = transform.to_matrix(base_size, jump);
    Some(match world.get::<&SpriteFrame>(entity) {
        Ok(frame) => matrix * frame.to_matrix(base_size),
        Err(_) => matrix,
    })
}

/// Build both model matrices of an entity.
///
/// Returns `None` when the entity has no transform or its layer is not
/// registered. Ancestors without a transform contribute identity.
pub fn build_model(
    world: &hecs::World,
    entity: hecs::Entity,
    settings: &SceneSettings,
    layers: &LayerMap,
) -> Option<ModelMatrices> {
    let virtual_resolution = settings.virtual_resolution;
    let resolution = object_resolution(world, entity, layers, virtual_resolution)?;
    let mut matrix = local_matrix(world, entity)?;

    let mut current = entity;
    while let Some(parent) = parent_of(world, current) {
        let parent_local = local_matrix(world, parent).unwrap_or(Mat4::IDENTITY);
        let parent_resolution =
            object_resolution(world, parent, layers, virtual_resolution).unwrap_or(resolution);

        matrix = if parent_resolution == resolution {
            parent_local * matrix
        } else {
            // Bring the ancestor into this entity's resolution.
            let conversion = Mat4::from_scale((parent_resolution / resolution).extend(1.0));
            conversion.inverse() * parent_local * conversion * matrix
        };
        current = parent;
    }

    let to_virtual = Mat4::from_scale((virtual_resolution / resolution).extend(1.0));
    Some(ModelMatrices {
        in_object_resolution: matrix,
        in_virtual_resolution: to_virtual * matrix,
    })
}

/// Cached model matrices, rebuilt when dirty.
///
/// Missing inputs keep the last built matrices.
pub(crate) fn model_matrices(scene: &mut Scene, entity: hecs::Entity) -> Option<ModelMatrices> {
    let (dirty, cached) = {
        let model = scene.world.get::<&ModelMatrix>(entity).ok()?;
        (model.dirty, model.matrices)
    };
    if !dirty && cached.is_some() {
        return cached;
    }

    let built = build_model(&scene.world, entity, &scene.settings, &scene.layers);
    let mut model = scene.world.get::<&mut ModelMatrix>(entity).ok()?;
    model.dirty = false;
    match built {
        Some(matrices) => {
            tracing::trace!(?entity, "rebuilt model matrices");
            model.matrices = Some(matrices);
        }
        None => tracing::trace!(?entity, "model matrix inputs missing, keeping last value"),
    }
    model.matrices
}
