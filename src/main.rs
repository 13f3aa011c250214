// Staff demo: a small village on noise terrain.
// The systems here stand in for game logic that listens to the interaction events.
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::PI;

use staff_interaction::camera::{staff_camera_movement, toggle_view_mode, StaffCameraRig};
use staff_interaction::constants::*;
use staff_interaction::interaction::events::*;
use staff_interaction::registry::WorldObjects;
use staff_interaction::terrain::{HeightSampler, TerrainHeightmap};
use staff_interaction::types::*;
use staff_interaction::{InteractionSet, StaffInteractionController, StaffInteractionPlugin};

const GRAVITY: f32 = -9.81;
const MINION_COUNT: usize = 8;
const MINION_HALF_HEIGHT: f32 = 0.8;

#[derive(Resource)]
struct DemoAssets {
    minion_mesh: Handle<Mesh>,
    minion_material: Handle<StandardMaterial>,
    building_material: Handle<StandardMaterial>,
}

/// Free flight after a throw or drop, until the entity touches the terrain
#[derive(Component)]
struct Ballistic {
    velocity: Vec3,
}

#[derive(Component)]
struct StatusText;

#[derive(Component)]
struct FpsText;

#[derive(Resource, Default)]
struct SpawnCounter(u32);

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Staff Interaction Demo".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .add_plugins(StaffInteractionPlugin::default())
        .insert_resource(TerrainHeightmap::generate(7, TERRAIN_GRID_SIZE, TERRAIN_SIZE, TERRAIN_MAX_HEIGHT))
        .init_resource::<SpawnCounter>()
        .add_systems(Startup, setup_scene)
        .add_systems(
            Update,
            (toggle_view_mode, staff_camera_movement)
                .chain()
                .before(InteractionSet::Sync),
        )
        .add_systems(
            Update,
            (
                launch_released,
                ballistic_flight,
                spawn_requested_minions,
                raise_foundations,
                log_interaction_events,
                update_status_text,
                update_fps_display,
            )
                .after(InteractionSet::Present),
        )
        .run();
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    heightmap: Res<TerrainHeightmap>,
    mut counter: ResMut<SpawnCounter>,
) {
    commands.spawn((
        Mesh3d(meshes.add(heightmap.build_mesh())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.35, 0.5, 0.25),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::default(),
        GroundSurface,
        Name::new("Terrain"),
    ));

    // Directional light (sun)
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 50.0, 0.0).with_rotation(Quat::from_rotation_x(-PI / 4.0)),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.4, 0.4, 0.6),
        brightness: 300.0,
        affects_lightmapped_meshes: false,
    });

    let assets = DemoAssets {
        minion_mesh: meshes.add(Capsule3d::new(0.4, 0.8)),
        minion_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.8, 0.55, 0.3),
            ..default()
        }),
        building_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.6, 0.6, 0.65),
            perceptual_roughness: 0.7,
            ..default()
        }),
    };

    let mut rng = rand::thread_rng();
    for _ in 0..MINION_COUNT {
        let x = rng.gen_range(-20.0..20.0);
        let z = rng.gen_range(-20.0..20.0);
        spawn_minion(&mut commands, &assets, &heightmap, &mut counter, Vec3::new(x, 0.0, z));
    }

    let houses = [("Hall", Vec3::new(12.0, 0.0, -8.0), 4.0), ("Forge", Vec3::new(-14.0, 0.0, 6.0), 3.0)];
    for (i, (name, position, size)) in houses.into_iter().enumerate() {
        let y = heightmap.height_at(position.x, position.z) + size * 0.5;
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::new(size, size, size))),
            MeshMaterial3d(assets.building_material.clone()),
            Transform::from_xyz(position.x, y, position.z),
            Building,
            InteractionId(format!("building-{}", i)),
            EntityMetadata {
                name: Some(name.to_string()),
                building_type: Some("house".to_string()),
                ..default()
            },
        ));
    }
    commands.insert_resource(assets);

    let rig = StaffCameraRig {
        focus_point: Vec3::ZERO,
        distance: 45.0,
        ..default()
    };
    commands
        .spawn((
            Camera3d::default(),
            Camera::default(),
            rig.pose(true, 0.0),
            rig,
            StaffCamera,
        ))
        .with_children(|camera| {
            camera.spawn((Transform::from_translation(BEAM_CAMERA_OFFSET), StaffTip));
        });

    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        StatusText,
    ));
    commands.spawn((
        Text::new("FPS: --"),
        TextFont {
            font_size: 24.0,
            ..default()
        },
        TextColor(Color::srgb(0.3, 0.95, 0.4)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            right: Val::Px(10.0),
            ..default()
        },
        FpsText,
    ));
}

fn spawn_minion(
    commands: &mut Commands,
    assets: &DemoAssets,
    heightmap: &TerrainHeightmap,
    counter: &mut SpawnCounter,
    position: Vec3,
) {
    counter.0 += 1;
    let y = heightmap.height_at(position.x, position.z) + MINION_HALF_HEIGHT;
    commands.spawn((
        Mesh3d(assets.minion_mesh.clone()),
        MeshMaterial3d(assets.minion_material.clone()),
        Transform::from_xyz(position.x, y, position.z),
        Minion,
        InteractionId(format!("minion-{}", counter.0)),
        EntityMetadata {
            name: Some(format!("Minion {}", counter.0)),
            state: Some("idle".to_string()),
            personality: Some("curious".to_string()),
            ..default()
        },
    ));
}

/// Thrown and dropped entities fall under gravity
fn launch_released(
    mut commands: Commands,
    mut thrown: EventReader<EntityThrown>,
    mut released: EventReader<EntityReleased>,
    objects: Res<WorldObjects>,
) {
    let launches = thrown
        .read()
        .map(|e| (e.id.clone(), e.velocity))
        .chain(released.read().map(|e| (e.id.clone(), e.velocity)));
    for (id, velocity) in launches {
        if let Some(entity) = objects.get(&id) {
            commands.entity(entity.handle).try_insert(Ballistic { velocity });
        }
    }
}

fn ballistic_flight(
    time: Res<Time>,
    mut commands: Commands,
    heightmap: Res<TerrainHeightmap>,
    objects: Res<WorldObjects>,
    mut flying: Query<(Entity, &InteractionId, &mut Transform, &mut Ballistic)>,
) {
    let dt = time.delta_secs();
    for (entity, id, mut transform, mut ballistic) in flying.iter_mut() {
        // Grabbed again mid-flight: the staff owns it now
        if objects.get(&id.0).and_then(|e| e.claim()).is_some() {
            commands.entity(entity).try_remove::<Ballistic>();
            continue;
        }
        ballistic.velocity.y += GRAVITY * dt;
        transform.translation += ballistic.velocity * dt;

        let rest_y = heightmap.height_at(transform.translation.x, transform.translation.z) + MINION_HALF_HEIGHT;
        if transform.translation.y <= rest_y {
            transform.translation.y = rest_y;
            let (yaw, _, _) = transform.rotation.to_euler(EulerRot::YXZ);
            transform.rotation = Quat::from_rotation_y(yaw);
            commands.entity(entity).try_remove::<Ballistic>();
        }
    }
}

fn spawn_requested_minions(
    mut commands: Commands,
    mut requests: EventReader<SpawnRequested>,
    assets: Res<DemoAssets>,
    heightmap: Res<TerrainHeightmap>,
    mut counter: ResMut<SpawnCounter>,
) {
    for request in requests.read() {
        spawn_minion(&mut commands, &assets, &heightmap, &mut counter, request.position);
    }
}

/// Completed foundations become low buildings covering the drawn bounds
fn raise_foundations(
    mut commands: Commands,
    mut completed: EventReader<FoundationCompleted>,
    mut meshes: ResMut<Assets<Mesh>>,
    assets: Res<DemoAssets>,
    mut counter: ResMut<SpawnCounter>,
) {
    for event in completed.read() {
        let foundation = &event.foundation;
        let size = foundation.bounds.max - foundation.bounds.min;
        let height = 2.0;
        counter.0 += 1;
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::new(size.x, height, size.z))),
            MeshMaterial3d(assets.building_material.clone()),
            Transform::from_xyz(foundation.center.x, foundation.bounds.max.y + height * 0.5, foundation.center.z),
            Building,
            InteractionId(format!("building-drawn-{}", counter.0)),
            EntityMetadata {
                name: Some(format!("Workshop ({} cells)", foundation.area)),
                building_type: Some("workshop".to_string()),
                ..default()
            },
        ));
    }
}

fn log_interaction_events(
    mut menu_selected: EventReader<MenuActionSelected>,
    mut move_finished: EventReader<BuildingMoveFinished>,
) {
    for event in menu_selected.read() {
        info!("[game] {} requested for {:?} {:?}", event.action.label(), event.target_kind, event.target_id);
    }
    for event in move_finished.read() {
        let verb = if event.committed { "moved to" } else { "stays at" };
        info!("[game] {} {} cell {:?}", event.building_id, verb, event.grid);
    }
}

fn update_status_text(
    controller: Res<StaffInteractionController>,
    mut text: Query<&mut Text, With<StatusText>>,
) {
    let Ok(mut text) = text.single_mut() else { return };
    let mut status = format!(
        "Mode: {:?}\nLeft: press/hold | Right: back | Enter: confirm | Esc: cancel | Tab: view | Middle-drag: rotate",
        controller.mode()
    );
    if let Some(menu) = controller.menu() {
        let entries: Vec<String> = menu
            .actions()
            .iter()
            .enumerate()
            .map(|(slot, action)| {
                if Some(slot) == menu.highlighted_slot() {
                    format!("[{}]", action.label())
                } else {
                    action.label().to_string()
                }
            })
            .collect();
        status.push_str(&format!("\nMenu: {}", entries.join("  ")));
    }
    if let Some(target) = controller.quick_info() {
        let name = target.metadata.name.as_deref().unwrap_or("ground");
        status.push_str(&format!("\nInfo: {} ({:?})", name, target.kind));
        if let Some(state) = &target.metadata.state {
            status.push_str(&format!(" - {}", state));
        }
    }
    if controller.mode() == InteractionMode::Drawing {
        let drawer = controller.drawer();
        status.push_str(&format!("\nCells: {}", drawer.selected_count()));
        if let Some(cell) = drawer.hovered_cell() {
            status.push_str(&format!(" | cursor at ({}, {})", cell.x, cell.y));
        }
    }
    **text = status;
}

fn update_fps_display(mut query: Query<&mut Text, With<FpsText>>, diagnostics: Res<DiagnosticsStore>) {
    if let Ok(mut text) = query.single_mut() {
        let fps = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed())
            .unwrap_or(0.0);
        **text = format!("FPS: {:.0}", fps);
    }
}
