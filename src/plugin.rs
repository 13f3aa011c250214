// Staff interaction plugin - wires the orchestrator into the Bevy frame
//
// Frame order (chained InteractionSet):
//   Sync:     ECS transforms and camera -> registry and StaffView
//   Input:    mouse/keyboard -> orchestrator
//   Simulate: orchestrator frame update
//   Present:  registry -> ECS transforms, highlight, cells, ghost, beam, events
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use bevy::window::PrimaryWindow;
use std::collections::HashSet;

use crate::building_move::ghost::{setup_ghost_visuals, sync_move_ghost};
use crate::config::{InteractionConfig, ViewSettings};
use crate::foundation::visuals::{setup_foundation_visuals, sync_foundation_cells};
use crate::interaction::beam::{spawn_beam, staff_tip_origin, sync_beam_visual};
use crate::interaction::events::*;
use crate::interaction::{InteractionEvent, PointerButton, StaffInteractionController, StaffKey, ViewContext};
use crate::registry::WorldObjects;
use crate::targeting::highlight::{restore_highlight_material, sync_highlight, Highlighted};
use crate::targeting::{CameraProjector, ScreenProjector, TargetQuery};
use crate::terrain::{FlatGround, TerrainHeightmap};
use crate::types::*;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionSet {
    Sync,
    Input,
    Simulate,
    Present,
}

/// Camera and pointer state for the current frame.
/// Filled from the `StaffCamera` when one exists; headless apps may write it directly.
#[derive(Resource, Clone, Debug)]
pub struct StaffView {
    pub camera_position: Vec3,
    pub camera_forward: Vec3,
    pub cursor: Option<Vec2>,
    pub ray: Option<Ray3d>,
    pub beam_origin: Option<Vec3>,
}

impl Default for StaffView {
    fn default() -> Self {
        Self {
            camera_position: Vec3::ZERO,
            camera_forward: Vec3::NEG_Z,
            cursor: None,
            ray: None,
            beam_origin: None,
        }
    }
}

impl StaffView {
    /// Pointer query when a projector and cursor are available in isometric view, ray otherwise
    pub fn context<'a>(&self, projector: Option<&'a dyn ScreenProjector>, isometric: bool) -> ViewContext<'a> {
        let query = match (isometric, projector, self.cursor) {
            (true, Some(view), Some(screen)) => Some(TargetQuery::Pointer { screen, view }),
            _ => self.ray.map(TargetQuery::Ray),
        };
        ViewContext {
            camera_position: self.camera_position,
            camera_forward: self.camera_forward,
            query,
            beam_origin: self.beam_origin,
        }
    }
}

pub struct StaffInteractionPlugin {
    /// Spawn cell quads, ghost and beam mesh. Off for headless apps.
    /// Highlighting runs either way when the app has a `StandardMaterial` store.
    pub visuals: bool,
}

impl Default for StaffInteractionPlugin {
    fn default() -> Self {
        Self { visuals: true }
    }
}

impl Plugin for StaffInteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InteractionConfig>()
            .init_resource::<ViewSettings>()
            .init_resource::<WorldObjects>()
            .init_resource::<StaffView>()
            .init_resource::<StaffInteractionController>();
        add_interaction_events(app);

        app.configure_sets(
            Update,
            (
                InteractionSet::Sync,
                InteractionSet::Input,
                InteractionSet::Simulate,
                InteractionSet::Present,
            )
                .chain(),
        )
        .add_observer(register_interactable)
        .add_observer(unregister_interactable)
        .add_systems(
            Update,
            (
                (sync_ground_surface, sync_scene_to_registry, sync_staff_view).in_set(InteractionSet::Sync),
                handle_staff_input.in_set(InteractionSet::Input),
                update_staff_interaction.in_set(InteractionSet::Simulate),
                (write_back_transforms, dispatch_interaction_events)
                    .chain()
                    .in_set(InteractionSet::Present),
            ),
        );

        app.add_observer(restore_highlight_material)
            .add_systems(Update, apply_highlight.after(write_back_transforms).in_set(InteractionSet::Present));

        if self.visuals {
            app.add_systems(Startup, (setup_foundation_visuals, setup_ghost_visuals, spawn_beam))
                .add_systems(
                    Update,
                    (sync_foundation_cells, sync_move_ghost, sync_beam_visual).in_set(InteractionSet::Present),
                );
        }
    }
}

// ============================================================================
// ENTITY LIFECYCLE
// ============================================================================

/// Observer: entities spawned with `InteractionId` plus a `Minion` or `Building` marker join the registry
fn register_interactable(
    trigger: Trigger<OnAdd, InteractionId>,
    query: Query<(
        &InteractionId,
        Option<&Transform>,
        Has<Minion>,
        Has<Building>,
        Option<&EntityMetadata>,
        Option<&Name>,
    )>,
    mut objects: ResMut<WorldObjects>,
) {
    let entity = trigger.target();
    let Ok((id, transform, is_minion, is_building, metadata, name)) = query.get(entity) else {
        return;
    };
    let mut metadata = metadata.cloned().unwrap_or_default();
    if metadata.name.is_none() {
        metadata.name = name.map(|n| n.as_str().to_string());
    }

    let registered = if is_minion {
        objects.register_minion(id.0.clone(), entity, metadata)
    } else if is_building {
        objects.register_building(id.0.clone(), entity, metadata)
    } else {
        warn!("{} has an InteractionId but no Minion or Building marker", id.0);
        return;
    };
    registered.place(transform.copied().unwrap_or_default());
}

/// Observer: removal or despawn unwinds every controller that referenced the entity
fn unregister_interactable(
    trigger: Trigger<OnRemove, InteractionId>,
    ids: Query<&InteractionId>,
    mut controller: ResMut<StaffInteractionController>,
    mut objects: ResMut<WorldObjects>,
) {
    let entity = trigger.target();
    let Ok(id) = ids.get(entity) else { return };
    // The id may since have been re-registered to another entity
    if objects.get(&id.0).map(|e| e.handle) != Some(entity) {
        return;
    }
    controller.unregister_entity(&id.0, &mut objects);
}

// ============================================================================
// SYNC
// ============================================================================

/// System: Point the registry at the ground entity and the current height field
fn sync_ground_surface(
    grounds: Query<Entity, With<GroundSurface>>,
    added: Query<(), Added<GroundSurface>>,
    heightmap: Option<Res<TerrainHeightmap>>,
    mut objects: ResMut<WorldObjects>,
) {
    let heightmap_changed = heightmap.as_ref().is_some_and(|hm| hm.is_changed());
    if added.is_empty() && !heightmap_changed {
        return;
    }
    let handle = grounds.iter().next();
    match heightmap {
        Some(hm) => objects.set_ground_surface(handle, (*hm).clone()),
        None => objects.set_ground_surface(handle, FlatGround(0.0)),
    }
    debug!("Ground surface set to {:?}", handle);
}

/// System: Copy scene transforms and mesh bounds into the registry (claimed entities are skipped)
fn sync_scene_to_registry(
    scene: Query<(Entity, &Transform, Option<&Aabb>), With<InteractionId>>,
    mut objects: ResMut<WorldObjects>,
) {
    for (entity, transform, aabb) in scene.iter() {
        let half_extents = aabb.map(|aabb| Vec3::from(aabb.half_extents) * transform.scale);
        objects.sync_from_scene(entity, *transform, half_extents);
    }
}

/// System: Camera pose, cursor ray and beam origin for this frame
fn sync_staff_view(
    settings: Res<ViewSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<StaffCamera>>,
    tips: Query<&GlobalTransform, (With<StaffTip>, Without<StaffCamera>)>,
    mut warned: Local<bool>,
    mut view: ResMut<StaffView>,
    mut controller: ResMut<StaffInteractionController>,
) {
    if settings.is_changed() {
        controller.set_isometric(settings.isometric);
    }
    let Ok((camera, transform)) = cameras.single() else { return };

    let cursor = windows.single().ok().and_then(|w| w.cursor_position());
    let ray = if settings.isometric {
        cursor.and_then(|cursor| camera.viewport_to_world(transform, cursor).ok())
    } else {
        Some(Ray3d::new(transform.translation(), transform.forward()))
    };
    view.camera_position = transform.translation();
    view.camera_forward = *transform.forward();
    view.cursor = cursor;
    view.ray = ray;
    view.beam_origin = staff_tip_origin(&tips, &mut warned);
}

// ============================================================================
// INPUT + SIMULATE
// ============================================================================

fn handle_staff_input(
    time: Res<Time>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    mut mouse_motion_events: EventReader<MouseMotion>,
    view: Res<StaffView>,
    settings: Res<ViewSettings>,
    cameras: Query<(&Camera, &GlobalTransform), With<StaffCamera>>,
    mut controller: ResMut<StaffInteractionController>,
    mut objects: ResMut<WorldObjects>,
) {
    let now = time.elapsed_secs();
    let projector = cameras
        .iter()
        .next()
        .map(|(camera, transform)| CameraProjector { camera, transform });
    let ctx = view.context(projector.as_ref().map(|p| p as &dyn ScreenProjector), settings.isometric);
    let additive = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);

    for motion in mouse_motion_events.read() {
        controller.pointer_motion(motion.delta);
    }

    for (mouse, button) in [
        (MouseButton::Left, PointerButton::Primary),
        (MouseButton::Right, PointerButton::Secondary),
    ] {
        if mouse_buttons.just_pressed(mouse) {
            controller.pointer_down(button, additive, now, &ctx, &mut objects);
        }
        if mouse_buttons.just_released(mouse) {
            controller.pointer_up(button, now, &ctx, &mut objects);
        }
    }

    if keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::NumpadEnter) {
        controller.key_down(StaffKey::Confirm, &mut objects);
    }
    if keys.just_pressed(KeyCode::Escape) {
        controller.key_down(StaffKey::Cancel, &mut objects);
    }
}

fn update_staff_interaction(
    time: Res<Time>,
    view: Res<StaffView>,
    settings: Res<ViewSettings>,
    cameras: Query<(&Camera, &GlobalTransform), With<StaffCamera>>,
    mut controller: ResMut<StaffInteractionController>,
    mut objects: ResMut<WorldObjects>,
) {
    let projector = cameras
        .iter()
        .next()
        .map(|(camera, transform)| CameraProjector { camera, transform });
    let ctx = view.context(projector.as_ref().map(|p| p as &dyn ScreenProjector), settings.isometric);
    controller.update(time.elapsed_secs(), time.delta_secs(), &ctx, &mut objects);
}

// ============================================================================
// PRESENT
// ============================================================================

/// System: Push controller-written transforms back onto the scene entities
fn write_back_transforms(mut objects: ResMut<WorldObjects>, mut transforms: Query<&mut Transform>) {
    for (entity, transform) in objects.take_dirty() {
        if let Ok(mut current) = transforms.get_mut(entity) {
            *current = transform;
        }
    }
}

/// System: Tint the highlighted entity's meshes. Runs whenever the app has a material store.
fn apply_highlight(
    controller: Res<StaffInteractionController>,
    mut commands: Commands,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    highlighted: Query<Entity, With<Highlighted>>,
    children: Query<&Children>,
    mut mesh_materials: Query<&mut MeshMaterial3d<StandardMaterial>>,
    mut warned: Local<HashSet<Entity>>,
) {
    let Some(mut materials) = materials else { return };
    let desired = controller.highlighted_entity();
    let settled = highlighted.iter().all(|entity| Some(entity) == desired)
        && desired.is_none_or(|entity| highlighted.contains(entity));
    if settled {
        return;
    }
    sync_highlight(
        desired,
        &mut commands,
        &mut materials,
        &highlighted,
        &children,
        &mut mesh_materials,
        &mut warned,
    );
}

/// System: Drain the orchestrator's outbox into typed events
fn dispatch_interaction_events(
    mut controller: ResMut<StaffInteractionController>,
    mut mode_changed: EventWriter<ModeChanged>,
    mut menu_selected: EventWriter<MenuActionSelected>,
    mut foundation_completed: EventWriter<FoundationCompleted>,
    mut move_finished: EventWriter<BuildingMoveFinished>,
    mut thrown: EventWriter<EntityThrown>,
    mut released: EventWriter<EntityReleased>,
    mut spawn_requested: EventWriter<SpawnRequested>,
    mut info_shown: EventWriter<QuickInfoShown>,
    mut info_hidden: EventWriter<QuickInfoHidden>,
) {
    for event in controller.take_events() {
        match event {
            InteractionEvent::ModeChanged(mode) => {
                mode_changed.write(ModeChanged { mode });
            }
            InteractionEvent::MenuActionSelected { action, target_kind, target_id } => {
                menu_selected.write(MenuActionSelected { action, target_kind, target_id });
            }
            InteractionEvent::FoundationCompleted(foundation) => {
                foundation_completed.write(FoundationCompleted { foundation });
            }
            InteractionEvent::BuildingMoveFinished(outcome) => {
                move_finished.write(BuildingMoveFinished {
                    building_id: outcome.building_id,
                    grid: outcome.grid,
                    position: outcome.position,
                    committed: outcome.committed,
                });
            }
            InteractionEvent::EntityThrown(result) => {
                thrown.write(EntityThrown {
                    id: result.id,
                    velocity: result.velocity,
                    origin: result.origin_position,
                });
            }
            InteractionEvent::EntityReleased { id, velocity } => {
                released.write(EntityReleased { id, velocity });
            }
            InteractionEvent::SpawnRequested { position } => {
                spawn_requested.write(SpawnRequested { position });
            }
            InteractionEvent::QuickInfoShown(target) => {
                info_shown.write(QuickInfoShown { target });
            }
            InteractionEvent::QuickInfoHidden => {
                info_hidden.write(QuickInfoHidden);
            }
        }
    }
}
