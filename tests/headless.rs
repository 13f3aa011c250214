//! Headless integration tests for the staff interaction plugin.
//!
//! The full plugin runs under `MinimalPlugins` with visuals off. There is no
//! camera, so each test writes `StaffView` directly and drives the staff with
//! raw mouse and keyboard events the way a window would.
//!
//! Run with: `cargo test --test headless`

use bevy::asset::{AssetApp, AssetPlugin};
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::input::mouse::{MouseButtonInput, MouseMotion};
use bevy::input::{ButtonState, InputPlugin};
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use staff_interaction::interaction::events::*;
use staff_interaction::interaction::MenuAction;
use staff_interaction::targeting::highlight::Highlighted;
use staff_interaction::types::*;
use staff_interaction::{InteractionSet, StaffInteractionController, StaffInteractionPlugin, StaffView, ViewSettings, WorldObjects};

const FRAME: f32 = 1.0 / 60.0;

// ─────────────────────────────────────────────────────────────────────────────
// Test App Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the plugin published, collected after the Present set
#[derive(Resource, Default)]
struct Recorded {
    modes: Vec<InteractionMode>,
    menu_actions: Vec<MenuAction>,
    thrown: Vec<EntityThrown>,
    foundations: Vec<FoundationCompleted>,
    moves: Vec<BuildingMoveFinished>,
}

fn record_events(
    mut recorded: ResMut<Recorded>,
    mut modes: EventReader<ModeChanged>,
    mut menu: EventReader<MenuActionSelected>,
    mut thrown: EventReader<EntityThrown>,
    mut foundations: EventReader<FoundationCompleted>,
    mut moves: EventReader<BuildingMoveFinished>,
) {
    recorded.modes.extend(modes.read().map(|e| e.mode));
    recorded.menu_actions.extend(menu.read().map(|e| e.action));
    recorded.thrown.extend(thrown.read().cloned());
    recorded.foundations.extend(foundations.read().cloned());
    recorded.moves.extend(moves.read().cloned());
}

/// First-person staff over flat ground, one minion and one building
fn build_test_app() -> App {
    build_app(false)
}

/// Same scene with a material store, so highlighting has something to tint
fn build_test_app_with_materials() -> App {
    build_app(true)
}

fn build_app(materials: bool) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    if materials {
        app.add_plugins(AssetPlugin::default()).init_asset::<StandardMaterial>();
    }
    app.add_plugins(InputPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(FRAME)))
        .insert_resource(ViewSettings { isometric: false })
        .add_plugins(StaffInteractionPlugin { visuals: false })
        .init_resource::<Recorded>()
        .add_systems(Update, record_events.after(InteractionSet::Present));

    app.world_mut().spawn((GroundSurface, Transform::default()));
    app.world_mut().spawn((
        Minion,
        InteractionId("gob".to_string()),
        EntityMetadata::named("Gob"),
        Transform::from_xyz(0.0, 1.0, -10.0),
    ));
    app.world_mut().spawn((
        Building,
        InteractionId("hall".to_string()),
        Name::new("Hall"),
        Transform::from_xyz(20.0, 2.0, 0.0),
    ));

    look(&mut app, Vec3::new(0.0, 1.0, 0.0), Dir3::NEG_Z);
    app.update();
    app
}

fn look(app: &mut App, position: Vec3, forward: Dir3) {
    let mut view = app.world_mut().resource_mut::<StaffView>();
    view.camera_position = position;
    view.camera_forward = *forward;
    view.ray = Some(Ray3d::new(position, forward));
}

fn look_down_at(app: &mut App, x: f32, z: f32) {
    look(app, Vec3::new(x, 10.0, z), Dir3::NEG_Y);
}

fn tick(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

fn mouse(app: &mut App, button: MouseButton, state: ButtonState) {
    app.world_mut().send_event(MouseButtonInput {
        button,
        state,
        window: Entity::PLACEHOLDER,
    });
    app.update();
}

fn click(app: &mut App, button: MouseButton) {
    mouse(app, button, ButtonState::Pressed);
    mouse(app, button, ButtonState::Released);
}

fn key(app: &mut App, key_code: KeyCode, logical_key: Key) {
    app.world_mut().send_event(KeyboardInput {
        key_code,
        logical_key,
        state: ButtonState::Pressed,
        text: None,
        repeat: false,
        window: Entity::PLACEHOLDER,
    });
    app.update();
}

fn mode(app: &App) -> InteractionMode {
    app.world().resource::<StaffInteractionController>().mode()
}

fn ecs_translation(app: &mut App, id: &str) -> Option<Vec3> {
    let mut query = app.world_mut().query::<(&InteractionId, &Transform)>();
    query
        .iter(app.world())
        .find(|(iid, _)| iid.0 == id)
        .map(|(_, transform)| transform.translation)
}

fn entity_for(app: &mut App, id: &str) -> Entity {
    let mut query = app.world_mut().query::<(Entity, &InteractionId)>();
    query
        .iter(app.world())
        .find(|(_, iid)| iid.0 == id)
        .map(|(entity, _)| entity)
        .expect("entity exists")
}

fn material_of(app: &App, entity: Entity) -> Option<Handle<StandardMaterial>> {
    app.world()
        .get::<MeshMaterial3d<StandardMaterial>>(entity)
        .map(|material| material.0.clone())
}

fn material_exists(app: &App, handle: &Handle<StandardMaterial>) -> bool {
    app.world().resource::<Assets<StandardMaterial>>().get(handle).is_some()
}

/// Hold the primary button past the threshold, let go, then look up at slot 0
fn open_menu_and_pick_first(app: &mut App) {
    mouse(app, MouseButton::Left, ButtonState::Pressed);
    assert_eq!(mode(app), InteractionMode::Aiming);
    tick(app, 20);
    assert_eq!(mode(app), InteractionMode::Menu);
    mouse(app, MouseButton::Left, ButtonState::Released);
    assert_eq!(mode(app), InteractionMode::Menu, "release with nothing highlighted keeps the menu");

    app.world_mut().send_event(MouseMotion { delta: Vec2::new(0.0, -40.0) });
    app.update();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scene_entities_join_the_registry() {
    let app = build_test_app();
    let objects = app.world().resource::<WorldObjects>();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects.get("gob").map(|e| e.kind), Some(TargetKind::Minion));
    let hall = objects.get("hall").expect("hall registered");
    assert_eq!(hall.kind, TargetKind::Building);
    assert_eq!(hall.metadata.name.as_deref(), Some("Hall"));
    assert!(objects.ground().is_some());
}

#[test]
fn test_tap_shows_quick_info() {
    let mut app = build_test_app();
    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Idle);
    let controller = app.world().resource::<StaffInteractionController>();
    assert_eq!(controller.quick_info().and_then(|t| t.id.as_deref()), Some("gob"));
}

#[test]
fn test_hold_grab_and_throw() {
    let mut app = build_test_app();
    open_menu_and_pick_first(&mut app);
    {
        let controller = app.world().resource::<StaffInteractionController>();
        let menu = controller.menu().expect("menu open");
        assert_eq!(menu.kind(), TargetKind::Minion);
        assert_eq!(menu.highlighted(), Some(MenuAction::Grab));
    }

    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Grabbing);
    assert_eq!(app.world().resource::<Recorded>().menu_actions, vec![MenuAction::Grab]);

    tick(&mut app, 120);
    let held = ecs_translation(&mut app, "gob").expect("minion exists");
    assert!((held - Vec3::new(0.0, 1.0, -6.0)).length() < 0.1, "{:?}", held);

    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Idle);

    let recorded = app.world().resource::<Recorded>();
    assert_eq!(recorded.thrown.len(), 1);
    let thrown = &recorded.thrown[0];
    assert_eq!(thrown.id, "gob");
    assert!(thrown.velocity.z < 0.0 && thrown.velocity.y > 0.0);
    assert!(recorded.modes.ends_with(&[InteractionMode::Grabbing, InteractionMode::Idle]));
    assert_eq!(app.world().resource::<WorldObjects>().get("gob").and_then(|e| e.claim()), None);
}

#[test]
fn test_escape_closes_menu_and_restores_pose() {
    let mut app = build_test_app();
    open_menu_and_pick_first(&mut app);
    key(&mut app, KeyCode::Escape, Key::Escape);
    assert_eq!(mode(&app), InteractionMode::Idle);

    app.update();
    let mut query = app.world_mut().query::<(&InteractionId, &Transform)>();
    let (_, transform) = query
        .iter(app.world())
        .find(|(id, _)| id.0 == "gob")
        .expect("minion exists");
    assert_eq!(transform.translation, Vec3::new(0.0, 1.0, -10.0));
    assert_eq!(transform.rotation, Quat::IDENTITY);
}

#[test]
fn test_draw_foundation_from_ground_menu() {
    let mut app = build_test_app();
    look_down_at(&mut app, 6.0, 6.0);
    open_menu_and_pick_first(&mut app);
    assert_eq!(
        app.world().resource::<StaffInteractionController>().menu().and_then(|m| m.highlighted()),
        Some(MenuAction::Build)
    );
    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Drawing);

    // Drag a row of five cells
    mouse(&mut app, MouseButton::Left, ButtonState::Pressed);
    for x in [8.0, 10.0, 12.0, 14.0] {
        look_down_at(&mut app, x, 6.0);
        app.update();
    }
    mouse(&mut app, MouseButton::Left, ButtonState::Released);
    assert_eq!(app.world().resource::<StaffInteractionController>().drawer().selected_count(), 5);

    key(&mut app, KeyCode::Enter, Key::Enter);
    assert_eq!(mode(&app), InteractionMode::Idle);

    let recorded = app.world().resource::<Recorded>();
    assert_eq!(recorded.foundations.len(), 1);
    let foundation = &recorded.foundations[0].foundation;
    assert_eq!(foundation.area, 5);
    assert_eq!(foundation.grid_min, IVec2::new(3, 3));
    assert_eq!(foundation.grid_max, IVec2::new(7, 3));
}

#[test]
fn test_move_building_lands_on_new_cell() {
    let mut app = build_test_app();
    look_down_at(&mut app, 20.0, 0.0);
    open_menu_and_pick_first(&mut app);
    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Moving);

    look_down_at(&mut app, 30.0, 0.0);
    tick(&mut app, 40);
    click(&mut app, MouseButton::Left);
    tick(&mut app, 120);
    assert_eq!(mode(&app), InteractionMode::Idle);

    let recorded = app.world().resource::<Recorded>();
    assert_eq!(recorded.moves.len(), 1);
    assert!(recorded.moves[0].committed);
    assert_eq!(recorded.moves[0].grid, IVec2::new(15, 0));
    assert_eq!(ecs_translation(&mut app, "hall"), Some(Vec3::new(30.0, 2.0, 0.0)));
}

#[test]
fn test_despawning_grabbed_minion_returns_to_idle() {
    let mut app = build_test_app();
    open_menu_and_pick_first(&mut app);
    click(&mut app, MouseButton::Left);
    assert_eq!(mode(&app), InteractionMode::Grabbing);
    tick(&mut app, 5);

    let mut query = app.world_mut().query::<(Entity, &InteractionId)>();
    let gob = query
        .iter(app.world())
        .find(|(_, id)| id.0 == "gob")
        .map(|(entity, _)| entity)
        .expect("minion exists");
    app.world_mut().despawn(gob);
    assert_eq!(mode(&app), InteractionMode::Idle);

    tick(&mut app, 10);
    assert!(!app.world().resource::<WorldObjects>().contains("gob"));
    assert_eq!(mode(&app), InteractionMode::Idle);

    // The staff keeps working on what is left
    look_down_at(&mut app, 20.0, 0.0);
    click(&mut app, MouseButton::Left);
    let controller = app.world().resource::<StaffInteractionController>();
    assert_eq!(controller.quick_info().and_then(|t| t.id.as_deref()), Some("hall"));
}

#[test]
fn test_highlight_tints_hierarchy_and_restores_originals() {
    let mut app = build_test_app_with_materials();
    let gob = entity_for(&mut app, "gob");
    let hall = entity_for(&mut app, "hall");
    let (gob_original, hall_original) = {
        let mut materials = app.world_mut().resource_mut::<Assets<StandardMaterial>>();
        (
            materials.add(StandardMaterial::default()),
            materials.add(StandardMaterial::default()),
        )
    };

    // The minion's mesh sits on a child, the hall's on its root
    let gob_mesh = app.world_mut().spawn(MeshMaterial3d(gob_original.clone())).id();
    app.world_mut().entity_mut(gob).add_child(gob_mesh);
    app.world_mut().entity_mut(hall).insert(MeshMaterial3d(hall_original.clone()));

    app.update();
    assert!(app.world().get::<Highlighted>(gob).is_some());
    let gob_tint = material_of(&app, gob_mesh).expect("mesh material");
    assert_ne!(gob_tint, gob_original);
    let tint = app.world().resource::<Assets<StandardMaterial>>().get(&gob_tint).expect("tint asset");
    assert_ne!(tint.emissive, LinearRgba::BLACK);

    // Staying on target keeps the same tint
    tick(&mut app, 3);
    assert_eq!(material_of(&app, gob_mesh), Some(gob_tint.clone()));

    // Retarget: the minion gets its exact handle back
    look_down_at(&mut app, 20.0, 0.0);
    app.update();
    assert_eq!(material_of(&app, gob_mesh), Some(gob_original.clone()));
    assert!(!material_exists(&app, &gob_tint));
    assert!(app.world().get::<Highlighted>(gob).is_none());
    let hall_tint = material_of(&app, hall).expect("hall material");
    assert_ne!(hall_tint, hall_original);

    // Ground clears the highlight
    look_down_at(&mut app, 6.0, 6.0);
    app.update();
    assert_eq!(material_of(&app, hall), Some(hall_original.clone()));
    assert!(!material_exists(&app, &hall_tint));
    let mut highlighted = app.world_mut().query_filtered::<Entity, With<Highlighted>>();
    assert_eq!(highlighted.iter(app.world()).count(), 0);

    // Despawning the highlighted minion drops its tint asset
    look(&mut app, Vec3::new(0.0, 1.0, 0.0), Dir3::NEG_Z);
    app.update();
    let second_tint = material_of(&app, gob_mesh).expect("mesh material");
    assert_ne!(second_tint, gob_original);
    app.world_mut().despawn(gob);
    app.update();
    assert!(!material_exists(&app, &second_tint));
    assert!(material_exists(&app, &gob_original));
    assert_eq!(material_of(&app, hall), Some(hall_original));
}
