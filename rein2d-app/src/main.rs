use rein2d::prelude::*;

/// Counts its lock-step calls so the demo can show the batching order.
#[derive(Default)]
struct Caption {
    relayouts: u32,
}

impl LockStep for Caption {
    fn lock(&mut self) {}

    fn prepare_for_unlock(&mut self) {
        self.relayouts += 1;
        log::debug!("caption relayout #{}", self.relayouts);
    }

    fn unlock(&mut self) {}
}

fn build(scene: &mut Scene) -> anyhow::Result<(hecs::Entity, hecs::Entity)> {
    let panel = scene.spawn_image(Transform2D::from_position(40.0, 20.0), Image::new(120.0, 80.0));
    scene.set_bounds_with_children(panel, Some(BoundsWithChildren::new()))?;

    let list = scene.spawn_image(Transform2D::from_position(10.0, 10.0), Image::new(100.0, 60.0));
    scene.set_parent(list, Some(panel))?;
    for i in 0..6 {
        let row = scene.spawn_image(
            Transform2D::from_position(0.0, i as f32 * 16.0).with_z(1.0),
            Image::new(100.0, 16.0),
        );
        scene.set_parent(row, Some(list))?;
    }
    scene.set_crop_children(list, Some(CropChildren::new()))?;

    let caption = scene.spawn_image(Transform2D::from_position(0.0, 82.0), Image::new(120.0, 10.0));
    scene.set_parent(caption, Some(panel))?;
    scene.set_text_layout(caption, Some(Box::new(Caption::default())))?;
    Ok((panel, list))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = Scene::new(SceneSettings::new().virtual_resolution(320.0, 200.0));
    let viewport = scene.add_viewport(Viewport::new().scale(2.0, 2.0));
    let (panel, list) = build(&mut scene)?;

    for entity in scene.display_list() {
        let boxes = scene.bounding_boxes(entity, viewport)?;
        log::info!(
            "{entity:?}: render {:?}..{:?} cropped={}",
            boxes.render_box.bottom_left,
            boxes.render_box.top_right,
            boxes.fully_cropped
        );
    }

    // Move the panel and scroll the list as one batch.
    let batch = TreeLockStep::lock(&mut scene, panel)?;
    scene.set_position(panel, 60.0, 30.0)?;
    scene.set_start_point(list, 0.0, 24.0)?;
    batch.unlock(&mut scene)?;

    for event in scene.drain_events() {
        log::info!("event: {event:?}");
    }

    let union = scene.bounds_with_children(panel, viewport)?;
    log::info!(
        "panel with children: {:?}..{:?}",
        union.render_box.bottom_left,
        union.render_box.top_right
    );

    let point = Vec2::new(75.0, 45.0);
    log::info!("entity at {point:?}: {:?}", scene.entity_at(point, viewport)?);
    Ok(())
}
