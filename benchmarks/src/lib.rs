//! Scene fixtures shared by the benchmarks.

use rein2d::prelude::*;

/// A scene with `n` sprites laid out on a grid, every fourth one parented to
/// the previous so chains of depth 4 appear.
pub fn setup_sprite_scene(n: usize) -> anyhow::Result<(Scene, ViewportId, Vec<hecs::Entity>)> {
    let mut scene = Scene::new(SceneSettings::new().virtual_resolution(1280.0, 720.0));
    let viewport = scene.add_viewport(Viewport::new().scale(1.5, 1.5));

    let mut entities = Vec::with_capacity(n);
    for i in 0..n {
        let x = (i % 64) as f32 * 20.0;
        let y = (i / 64) as f32 * 20.0;
        let transform = Transform2D::from_position(x, y)
            .with_z((i % 7) as f32)
            .with_rotation((i % 360) as f32)
            .with_pivot(0.5, 0.5);
        let entity = scene.spawn_image(transform, Image::new(16.0, 16.0));
        if i % 4 != 0 {
            scene.set_parent(entity, Some(entities[i - 1]))?;
        }
        entities.push(entity);
    }
    Ok((scene, viewport, entities))
}

/// A scrolling container holding `n` cropped rows.
pub fn setup_cropped_list(n: usize) -> anyhow::Result<(Scene, ViewportId, hecs::Entity)> {
    let mut scene = Scene::new(SceneSettings::new().virtual_resolution(1280.0, 720.0));
    let viewport = scene.add_viewport(Viewport::new());
    let list = scene.spawn_image(Transform2D::from_position(100.0, 100.0), Image::new(300.0, 400.0));

    for i in 0..n {
        let row = scene.spawn_image(
            Transform2D::from_position(0.0, i as f32 * 24.0),
            Image::new(300.0, 24.0),
        );
        scene.set_parent(row, Some(list))?;
    }
    scene.set_crop_children(list, Some(CropChildren::new()))?;
    Ok((scene, viewport, list))
}
