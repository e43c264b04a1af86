//! Bounding Box Integration Tests
//!
//! Model matrices and per-viewport bounding boxes read through `Scene`.
//!
//! # Test Categories
//!
//! 1. **Matrices** - Identity, hierarchy, independent resolution
//! 2. **Boxes** - Placement, rotation, flips, viewports
//! 3. **Caching** - Recompute only what went stale
//! 4. **Events** - Coalesced change notifications

use rein2d::ecs::components::bounds::Bounds;
use rein2d::prelude::*;

const EPS: f32 = 1e-4;

fn scene() -> Scene {
    Scene::new(SceneSettings::new().virtual_resolution(320.0, 200.0))
}

fn near(a: Vec2, b: Vec2) -> bool {
    (a - b).length() < EPS
}

// =============================================================================
// Matrices
// =============================================================================

#[test]
fn test_root_identity_matrix() {
    let mut scene = scene();
    let e = scene.spawn(Transform2D::identity());
    let m = scene.model_matrices(e).unwrap();
    assert_eq!(m.in_object_resolution, Mat4::IDENTITY);
    assert_eq!(m.in_virtual_resolution, Mat4::IDENTITY);
}

#[test]
fn test_independent_resolution_rescales_virtual_matrix() {
    let mut scene = scene();
    let hd = scene.add_layer(RenderLayer::new(0).independent_resolution(640.0, 400.0));
    let e = scene.spawn_image(Transform2D::from_position(100.0, 100.0), Image::new(20.0, 20.0));
    scene.set_drawable(e, Drawable::new().on_layer(hd)).unwrap();
    let viewport = scene.add_viewport(Viewport::new());

    let m = scene.model_matrices(e).unwrap();
    let p = m.in_virtual_resolution.transform_point3(Vec3::new(20.0, 20.0, 0.0)).truncate();
    assert!(near(p, Vec2::new(60.0, 60.0)));

    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    let hit = boxes.hit_test_box.unwrap();
    assert!((hit.width() - 10.0).abs() < EPS);
    assert!((boxes.render_box.width() - 20.0).abs() < EPS);
}

// =============================================================================
// Boxes
// =============================================================================

#[test]
fn test_translated_box_corners() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(Transform2D::from_position(10.0, 20.0), Image::new(100.0, 50.0));

    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    let hit = boxes.hit_test_box.unwrap();
    assert_eq!(hit.bottom_left, Vec2::new(10.0, 20.0));
    assert_eq!(hit.bottom_right, Vec2::new(110.0, 20.0));
    assert_eq!(hit.top_left, Vec2::new(10.0, 70.0));
    assert_eq!(hit.top_right, Vec2::new(110.0, 70.0));
    assert_eq!(boxes.render_box, hit);
    assert_eq!(boxes.texture_box, BoundingBox::UNIT);
    assert!(!boxes.fully_cropped);
}

#[test]
fn test_full_turn_gives_same_box() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let transform = Transform2D::from_position(50.0, 50.0).with_pivot(0.5, 0.5);
    let a = scene.spawn_image(transform.with_rotation(30.0), Image::new(40.0, 20.0));
    let b = scene.spawn_image(transform.with_rotation(390.0), Image::new(40.0, 20.0));

    let box_a = scene.bounding_boxes(a, viewport).unwrap().hit_test_box.unwrap();
    let box_b = scene.bounding_boxes(b, viewport).unwrap().hit_test_box.unwrap();
    assert!(box_a.approx_eq(&box_b, 1e-3));
}

#[test]
fn test_mirrored_entity_has_canonical_hit_box() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(
        Transform2D::from_position(100.0, 0.0).with_scale(-1.0, 1.0),
        Image::new(10.0, 10.0),
    );
    let hit = scene.bounding_boxes(e, viewport).unwrap().hit_test_box.unwrap();
    assert_eq!(hit.bottom_left, Vec2::new(90.0, 0.0));
    assert_eq!(hit.top_right, Vec2::new(100.0, 10.0));
    assert!(hit.contains(Vec2::new(95.0, 5.0)));
}

#[test]
fn test_viewport_pan_and_zoom_move_render_box_only() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new().pan(10.0, 0.0).scale(2.0, 2.0));
    let e = scene.spawn_image(Transform2D::from_position(20.0, 0.0), Image::new(10.0, 10.0));

    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    assert_eq!(boxes.hit_test_box.unwrap().bottom_left, Vec2::new(20.0, 0.0));
    assert!(near(boxes.render_box.bottom_left, Vec2::new(20.0, 0.0)));
    assert!(near(boxes.render_box.top_right, Vec2::new(40.0, 20.0)));
}

#[test]
fn test_parallax_layer() {
    let mut scene = scene();
    let background = scene.add_layer(RenderLayer::new(10).parallax_speed(0.5, 0.5));
    let viewport = scene.add_viewport(Viewport::new().pan(100.0, 0.0));
    let e = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    scene.set_drawable(e, Drawable::new().on_layer(background)).unwrap();

    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    assert!(near(boxes.render_box.bottom_left, Vec2::new(-50.0, 0.0)));
}

#[test]
fn test_ignore_viewport_hit_box_is_viewport_independent() {
    let mut scene = scene();
    let plain = scene.add_viewport(Viewport::new());
    let zoomed = scene.add_viewport(Viewport::new().pan(50.0, 30.0).scale(2.0, 3.0).rotation(15.0));
    let hud = scene.spawn_image(Transform2D::from_position(5.0, 5.0), Image::new(30.0, 10.0));
    scene.set_drawable(hud, Drawable::new().ignoring_viewport()).unwrap();

    let a = scene.bounding_boxes(hud, plain).unwrap();
    let b = scene.bounding_boxes(hud, zoomed).unwrap();
    assert_eq!(a.hit_test_box, b.hit_test_box);
    assert_eq!(a.render_box, b.render_box);
    assert_eq!(b.render_box, b.hit_test_box.unwrap());
}

#[test]
fn test_texture_offset_shifts_uvs() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    scene.set_drawable(e, Drawable::new().ignoring_viewport()).unwrap();
    scene.bounding_boxes(e, viewport).unwrap();

    scene.set_texture_offset(e, 0.5, 0.0).unwrap();
    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    assert_eq!(boxes.texture_box.bottom_left, Vec2::new(0.5, 0.0));
    assert_eq!(boxes.texture_box.top_right, Vec2::new(1.5, 1.0));
}

#[test]
fn test_quad_vertices_follow_render_box() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(Transform2D::from_position(1.0, 2.0), Image::new(3.0, 4.0));
    let quad = scene.bounding_boxes(e, viewport).unwrap().quad_vertices();
    assert_eq!(quad[0], QuadVertex::new([1.0, 2.0], [0.0, 0.0]));
    assert_eq!(quad[3], QuadVertex::new([4.0, 6.0], [1.0, 1.0]));
}

#[test]
fn test_entity_without_image_has_no_hit_box() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn(Transform2D::identity());
    assert!(scene.bounding_boxes(e, viewport).unwrap().hit_test_box.is_none());

    // The image arrives later.
    scene.set_image(e, Some(Image::new(8.0, 8.0))).unwrap();
    assert!(scene.bounding_boxes(e, viewport).unwrap().hit_test_box.is_some());
}

// =============================================================================
// Caching
// =============================================================================

fn recomputations(scene: &Scene, e: hecs::Entity) -> u64 {
    scene.world().get::<&Bounds>(e).unwrap().recomputations()
}

#[test]
fn test_viewport_change_keeps_hit_test_geometry() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    scene.bounding_boxes(e, viewport).unwrap();

    scene.set_viewport(viewport, Viewport::new().pan(5.0, 0.0)).unwrap();
    let bounds = scene.world().get::<&Bounds>(e).unwrap();
    assert!(!bounds.dirty_flags().hit_test);
    drop(bounds);

    let boxes = scene.bounding_boxes(e, viewport).unwrap();
    assert_eq!(boxes.render_box.bottom_left, Vec2::new(-5.0, 0.0));
    assert_eq!(recomputations(&scene, e), 2);
}

#[test]
fn test_viewports_are_cached_separately() {
    let mut scene = scene();
    let left = scene.add_viewport(Viewport::new());
    let right = scene.add_viewport(Viewport::new().pan(100.0, 0.0));
    let e = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));

    let a = scene.bounding_boxes(e, left).unwrap();
    let b = scene.bounding_boxes(e, right).unwrap();
    assert_ne!(a.render_box, b.render_box);
    assert_eq!(recomputations(&scene, e), 2);

    // Moving one viewport leaves the other's entry fresh.
    scene.set_viewport(right, Viewport::new().pan(50.0, 0.0)).unwrap();
    assert_eq!(scene.bounding_boxes(e, left).unwrap(), a);
    assert_eq!(recomputations(&scene, e), 2);
}

#[test]
fn test_viewport_matrix_shared_across_entities() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new().scale(2.0, 2.0));
    for i in 0..10 {
        let e = scene.spawn_image(Transform2D::from_position(i as f32, 0.0), Image::new(1.0, 1.0));
        scene.bounding_boxes(e, viewport).unwrap();
    }
    assert_eq!(scene.viewport_matrix_builds(), 1);
}

#[test]
fn test_removed_viewport_is_unknown() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let e = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    scene.bounding_boxes(e, viewport).unwrap();

    scene.remove_viewport(viewport).unwrap();
    assert_eq!(
        scene.bounding_boxes(e, viewport),
        Err(SceneError::UnknownViewport(viewport))
    );
}

#[test]
fn test_reparent_moves_boxes() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let parent = scene.spawn(Transform2D::from_position(100.0, 100.0));
    let e = scene.spawn_image(Transform2D::from_position(1.0, 1.0), Image::new(10.0, 10.0));
    scene.bounding_boxes(e, viewport).unwrap();

    scene.set_parent(e, Some(parent)).unwrap();
    let hit = scene.bounding_boxes(e, viewport).unwrap().hit_test_box.unwrap();
    assert_eq!(hit.bottom_left, Vec2::new(101.0, 101.0));
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_parent_move_notifies_descendants() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let parent = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    let child = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    scene.set_parent(child, Some(parent)).unwrap();
    scene.bounding_boxes(parent, viewport).unwrap();
    scene.bounding_boxes(child, viewport).unwrap();
    scene.drain_events();

    scene.set_position(parent, 3.0, 0.0).unwrap();
    let events = scene.drain_events();
    assert!(events.contains(&SceneEvent::BoundingBoxesChanged(parent)));
    assert!(events.contains(&SceneEvent::BoundingBoxesChanged(child)));

    let hit = scene.bounding_boxes(child, viewport).unwrap().hit_test_box.unwrap();
    assert_eq!(hit.bottom_left, Vec2::new(3.0, 0.0));
}

#[test]
fn test_bounds_with_children_union() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let panel = scene.spawn_image(Transform2D::identity(), Image::new(100.0, 100.0));
    let child = scene.spawn_image(Transform2D::from_position(90.0, 90.0), Image::new(20.0, 20.0));
    scene.set_parent(child, Some(panel)).unwrap();
    scene.set_bounds_with_children(panel, Some(BoundsWithChildren::new())).unwrap();

    let union = scene.bounds_with_children(panel, viewport).unwrap();
    assert_eq!(union.render_box, BoundingBox::from_rect(0.0, 0.0, 110.0, 110.0));
    assert_eq!(union.hit_test_box, Some(BoundingBox::from_rect(0.0, 0.0, 110.0, 110.0)));

    scene.drain_events();
    scene.set_visible(child, false).unwrap();
    assert!(scene
        .drain_events()
        .contains(&SceneEvent::BoundsWithChildrenChanged(panel)));
    let union = scene.bounds_with_children(panel, viewport).unwrap();
    assert_eq!(union.render_box, BoundingBox::from_rect(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_bounds_with_children_skips_excluded() {
    let mut scene = scene();
    let viewport = scene.add_viewport(Viewport::new());
    let panel = scene.spawn_image(Transform2D::identity(), Image::new(10.0, 10.0));
    let far = scene.spawn_image(Transform2D::from_position(500.0, 0.0), Image::new(10.0, 10.0));
    scene.set_parent(far, Some(panel)).unwrap();
    scene
        .set_bounds_with_children(panel, Some(BoundsWithChildren::new().excluding(far)))
        .unwrap();

    let union = scene.bounds_with_children(panel, viewport).unwrap();
    assert_eq!(union.render_box, BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0));
}
