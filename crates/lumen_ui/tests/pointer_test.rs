//! # Pointer Routing Tests
//!
//! Gesture scenarios end to end: queued samples, one `update()` per frame,
//! events read back from the frame report.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec2, Vec3};
use lumen_scene::NodeId;
use lumen_ui::{
    Anchor, CameraView, PointerAction, PointerEvent, PointerEventKind, PointerId, PointerSample,
    ScreenConfig, ScreenType, UiSystem,
};

fn overlay() -> (UiSystem, NodeId) {
    let mut ui = UiSystem::default();
    let (root, _) = ui
        .spawn_screen(None, &ScreenConfig::overlay("hud", 800.0, 600.0))
        .unwrap();
    (ui, root)
}

fn element(ui: &mut UiSystem, parent: NodeId, corners: [f32; 4]) -> NodeId {
    let node = ui.spawn_element("element", Some(parent)).unwrap();
    ui.set_corners(node, corners).unwrap();
    node
}

fn frame(ui: &mut UiSystem, samples: &[PointerSample]) -> Vec<PointerEvent> {
    for &sample in samples {
        ui.pointer(sample);
    }
    ui.update().events
}

fn kinds_for(events: &[PointerEvent], node: NodeId) -> Vec<PointerEventKind> {
    events.iter().filter(|e| e.target == node).map(|e| e.kind).collect()
}

/// Test: a zero-size node drawn on top never blocks its sibling behind.
#[test]
fn test_zero_size_node_passes_through() {
    let (mut ui, root) = overlay();
    let back = element(&mut ui, root, [0.0, 0.0, 200.0, 200.0]);
    let front = element(&mut ui, root, [50.0, 50.0, 50.0, 50.0]);
    ui.update();

    assert!(ui.layout(front).unwrap().draw_order() > ui.layout(back).unwrap().draw_order());
    let hit = ui.pick(Vec2::new(50.0, 550.0)).unwrap();
    assert_eq!(hit.target, back);
}

/// Test: a node spawned this frame is hit on top of an older sibling
/// before its draw order has been assigned.
#[test]
fn test_new_sibling_hit_in_spawn_frame() {
    let (mut ui, root) = overlay();
    let back = element(&mut ui, root, [0.0, 0.0, 200.0, 200.0]);
    ui.update();

    let front = element(&mut ui, root, [0.0, 0.0, 200.0, 200.0]);
    let events = frame(&mut ui, &[PointerSample::mouse_down(50.0, 550.0)]);

    assert!(kinds_for(&events, front).contains(&PointerEventKind::Down));
    assert!(!kinds_for(&events, back).contains(&PointerEventKind::Down), "back got {events:?}");
    assert_eq!(ui.router().captured(PointerId::Mouse), Some(front));
    assert!(ui.layout(front).unwrap().draw_order() > ui.layout(back).unwrap().draw_order());
}

/// Test: a mirrored node is transparent, but its children still hit.
#[test]
fn test_mirrored_node_passes_through_to_children() {
    let (mut ui, root) = overlay();
    let back = element(&mut ui, root, [0.0, 0.0, 400.0, 400.0]);
    let mirrored = element(&mut ui, root, [0.0, 0.0, 400.0, 400.0]);
    ui.set_local_scale(mirrored, Vec3::new(-1.0, 1.0, 1.0)).unwrap();
    let inner = ui.spawn_element("inner", Some(mirrored)).unwrap();
    ui.set_anchor(inner, Anchor::FILL).unwrap();
    ui.update();

    // The mirrored node itself never accepts; its child does.
    let hit = ui.pick(Vec2::new(100.0, 500.0)).unwrap();
    assert_eq!(hit.target, inner);
    assert!(hit.path.iter().all(|&(n, _)| n != mirrored));

    ui.set_enabled(inner, false).unwrap();
    ui.update();
    assert_eq!(ui.pick(Vec2::new(100.0, 500.0)).unwrap().target, back);
}

/// Test: down on A, move outside, up elsewhere: A still gets up and click.
#[test]
fn test_capture_survives_leaving_the_node() {
    let (mut ui, root) = overlay();
    let a = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    ui.update();

    let mut events = frame(&mut ui, &[PointerSample::mouse_down(50.0, 550.0)]);
    assert_eq!(ui.router().captured(PointerId::Mouse), Some(a));

    events.extend(frame(&mut ui, &[PointerSample::mouse_move(500.0, 100.0)]));
    assert_eq!(ui.router().captured(PointerId::Mouse), Some(a));

    events.extend(frame(&mut ui, &[PointerSample::mouse_up(700.0, 50.0)]));
    assert_eq!(ui.router().captured(PointerId::Mouse), None);

    let semantic: Vec<_> = kinds_for(&events, a)
        .into_iter()
        .filter(|k| !matches!(k, PointerEventKind::Enter | PointerEventKind::Move))
        .collect();
    assert_eq!(
        semantic,
        vec![
            PointerEventKind::Down,
            PointerEventKind::Leave,
            PointerEventKind::Up,
            PointerEventKind::Click,
        ]
    );

    // Dragging outside still reports moves to the captured node.
    assert!(kinds_for(&events, a).contains(&PointerEventKind::Move));
}

/// Test: up without a preceding down goes to the hit node, no click.
#[test]
fn test_up_without_capture() {
    let (mut ui, root) = overlay();
    let a = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    ui.update();

    let events = frame(&mut ui, &[PointerSample::mouse_up(50.0, 550.0)]);
    assert_eq!(kinds_for(&events, a), vec![PointerEventKind::Up]);
}

/// Test: focus loss forces an up; the real up afterwards is swallowed.
#[test]
fn test_focus_loss_forces_single_up() {
    let (mut ui, root) = overlay();
    let b = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    ui.update();

    frame(&mut ui, &[PointerSample::mouse_down(50.0, 550.0)]);
    assert_eq!(ui.router().captured(PointerId::Mouse), Some(b));

    ui.focus_lost();
    let events = ui.update().events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, PointerEventKind::Up);
    assert_eq!(events[0].target, b);
    assert!(events[0].forced);
    assert_eq!(ui.router().captured(PointerId::Mouse), None);
    assert!(!ui.router().gesture(PointerId::Mouse).unwrap().pressed);

    let events = frame(&mut ui, &[PointerSample::mouse_up(50.0, 550.0)]);
    assert!(kinds_for(&events, b).is_empty(), "duplicate release: {events:?}");

    // The next gesture behaves normally again.
    let events = frame(
        &mut ui,
        &[PointerSample::mouse_down(50.0, 550.0), PointerSample::mouse_up(50.0, 550.0)],
    );
    assert_eq!(
        kinds_for(&events, b),
        vec![PointerEventKind::Down, PointerEventKind::Up, PointerEventKind::Click]
    );
}

/// Test: touch cancel releases only that finger.
#[test]
fn test_touch_cancel_releases_one_pointer() {
    let (mut ui, root) = overlay();
    let left = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    let right = element(&mut ui, root, [200.0, 0.0, 300.0, 100.0]);
    ui.update();

    frame(
        &mut ui,
        &[
            PointerSample::touch(PointerAction::Down, 0, 50.0, 550.0),
            PointerSample::touch(PointerAction::Down, 1, 250.0, 550.0),
        ],
    );
    let events = frame(&mut ui, &[PointerSample::touch(PointerAction::Cancel, 0, 50.0, 550.0)]);

    let up = events.iter().find(|e| e.kind == PointerEventKind::Up).unwrap();
    assert_eq!(up.target, left);
    assert!(up.forced);
    assert!(kinds_for(&events, right).is_empty());
    assert_eq!(ui.router().captured(PointerId::Touch(1)), Some(right));
}

/// Test: disabling a hovered node emits leave.
#[test]
fn test_disable_emits_leave() {
    let (mut ui, root) = overlay();
    let a = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    ui.update();

    let events = frame(&mut ui, &[PointerSample::mouse_move(50.0, 550.0)]);
    assert_eq!(kinds_for(&events, a), vec![PointerEventKind::Enter, PointerEventKind::Move]);

    ui.set_enabled(a, false).unwrap();
    let events = ui.update().events;
    assert_eq!(kinds_for(&events, a), vec![PointerEventKind::Leave]);
    assert!(ui.pick(Vec2::new(50.0, 550.0)).is_none());
}

/// Test: destroying a captured node drops it silently.
#[test]
fn test_destroy_clears_capture_silently() {
    let (mut ui, root) = overlay();
    let a = element(&mut ui, root, [0.0, 0.0, 100.0, 100.0]);
    ui.update();
    frame(&mut ui, &[PointerSample::mouse_down(50.0, 550.0)]);

    ui.remove_node(a).unwrap();
    assert_eq!(ui.router().captured(PointerId::Mouse), None);

    let events = frame(&mut ui, &[PointerSample::mouse_up(50.0, 550.0)]);
    assert!(events.is_empty());
}

/// Test: higher priority screens are tested first; disabled ones never.
#[test]
fn test_screen_priority() {
    let mut ui = UiSystem::default();
    let (low_root, _) = ui
        .spawn_screen(None, &ScreenConfig::overlay("low", 800.0, 600.0))
        .unwrap();
    let (high_root, high) = ui
        .spawn_screen(None, &ScreenConfig::overlay("high", 800.0, 600.0).with_priority(10))
        .unwrap();
    let low_panel = ui.spawn_element("low", Some(low_root)).unwrap();
    let high_panel = ui.spawn_element("high", Some(high_root)).unwrap();
    ui.set_anchor(low_panel, Anchor::FILL).unwrap();
    ui.set_anchor(high_panel, Anchor::FILL).unwrap();
    ui.update();

    assert_eq!(ui.pick(Vec2::new(400.0, 300.0)).unwrap().target, high_panel);

    ui.set_screen_enabled(high, false).unwrap();
    assert_eq!(ui.pick(Vec2::new(400.0, 300.0)).unwrap().target, low_panel);
}

/// Test: listeners see the local point and the scroll amount.
#[test]
fn test_scroll_event_fields() {
    let (mut ui, root) = overlay();
    let list = element(&mut ui, root, [100.0, 100.0, 300.0, 500.0]);
    ui.update();

    let events = frame(&mut ui, &[PointerSample::mouse_wheel(150.0, 300.0, -1.5)]);
    assert_eq!(events.len(), 1);
    let scroll = events[0];
    assert_eq!(scroll.kind, PointerEventKind::Scroll);
    assert_eq!(scroll.target, list);
    assert_eq!(scroll.scroll, -1.5);
    assert!((scroll.point - Vec2::new(50.0, 200.0)).length() < 1e-3);
}

fn camera() -> CameraView {
    CameraView::perspective(Mat4::IDENTITY, FRAC_PI_2, Vec2::new(800.0, 600.0), 0.1, 100.0)
}

/// Test: a camera screen hangs in front of the camera; the view center
/// lands on the layout center.
#[test]
fn test_camera_screen_center_hit() {
    let mut ui = UiSystem::default();
    let config = ScreenConfig::overlay("cockpit", 800.0, 600.0).with_type(ScreenType::Camera);
    let (root, screen) = ui.spawn_screen(None, &config).unwrap();
    let panel = ui.spawn_element("panel", Some(root)).unwrap();
    ui.set_anchor(panel, Anchor::FILL).unwrap();
    ui.update();

    // No camera published yet: no ray, no hit.
    assert!(ui.pick(Vec2::new(400.0, 300.0)).is_none());

    ui.set_camera(screen, Some(camera())).unwrap();
    ui.update();
    let hit = ui.pick(Vec2::new(400.0, 300.0)).unwrap();
    assert_eq!(hit.target, panel);
    assert!((hit.point - Vec2::new(400.0, 300.0)).length() < 0.5, "got {}", hit.point);
}

/// Test: a world screen placed by its node's transform is hit through
/// the camera ray.
#[test]
fn test_world_screen_hit() {
    let mut ui = UiSystem::default();
    let config = ScreenConfig::overlay("sign", 800.0, 600.0).with_type(ScreenType::World);
    let (root, screen) = ui.spawn_screen(None, &config).unwrap();
    ui.set_local_position(root, Vec3::new(-4.0, -3.0, -10.0)).unwrap();
    let panel = ui.spawn_element("panel", Some(root)).unwrap();
    ui.set_anchor(panel, Anchor::FILL).unwrap();
    ui.set_camera(screen, Some(camera())).unwrap();
    ui.update();

    let hit = ui.pick(Vec2::new(400.0, 300.0)).unwrap();
    assert_eq!(hit.target, panel);
    assert!((hit.point - Vec2::new(400.0, 300.0)).length() < 0.5, "got {}", hit.point);

    // Behind the camera: the bounded ray never reaches it.
    ui.set_local_position(root, Vec3::new(-4.0, -3.0, 10.0)).unwrap();
    ui.update();
    assert!(ui.pick(Vec2::new(400.0, 300.0)).is_none());
}

/// Test: switching an overlay to a world screen switches ray
/// construction; without a camera the switch is a miss.
#[test]
fn test_screen_type_switch_changes_rays() {
    let (mut ui, root) = overlay();
    let panel = ui.spawn_element("panel", Some(root)).unwrap();
    ui.set_anchor(panel, Anchor::FILL).unwrap();
    ui.update();
    let screen = ui.layout(panel).unwrap().screen().unwrap();
    assert!(ui.pick(Vec2::new(400.0, 300.0)).is_some());

    ui.set_screen_type(screen, ScreenType::World).unwrap();
    ui.update();
    assert!(ui.pick(Vec2::new(400.0, 300.0)).is_none());

    ui.set_local_position(root, Vec3::new(-4.0, -3.0, -10.0)).unwrap();
    ui.set_camera(screen, Some(camera())).unwrap();
    ui.update();
    assert_eq!(ui.pick(Vec2::new(400.0, 300.0)).unwrap().target, panel);
}
