// Interaction orchestrator - the staff's mode state machine
//
// Owns one targeting system, grab controller, foundation drawer and building
// mover. Input calls mutate intent immediately; `update` runs once per frame in
// a fixed order: targeting, mode simulation, quick-info timer, beam.
//
// Submodules:
// - menu: context menu actions and radial look selection
// - beam: beam presentation state and its mesh
// - events: outbound messages

pub mod beam;
pub mod events;
pub mod menu;

use bevy::prelude::*;
use std::sync::Arc;

use crate::building_move::{BuildingMoveController, MovePhase};
use crate::config::{InteractionConfig, ViewSettings};
use crate::constants::SUSPEND_TILT;
use crate::foundation::FoundationDrawer;
use crate::grab::ForceGrabController;
use crate::registry::{Claim, RegisteredEntity, WorldObjects};
use crate::targeting::{TargetQuery, TargetingSystem};
use crate::terrain::{FlatGround, HeightSampler};
use crate::types::*;

pub use beam::BeamState;
pub use events::InteractionEvent;
pub use menu::{ContextMenu, MenuAction};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StaffKey {
    Confirm,
    Cancel,
}

/// Camera and pointer context handed to every input and update call
pub struct ViewContext<'a> {
    pub camera_position: Vec3,
    pub camera_forward: Vec3,
    pub query: Option<TargetQuery<'a>>,
    /// Staff tip position; `None` falls back to a fixed camera offset
    pub beam_origin: Option<Vec3>,
}

impl ViewContext<'static> {
    /// First-person view: the camera's own ray is the query
    pub fn first_person(position: Vec3, forward: Dir3) -> Self {
        Self {
            camera_position: position,
            camera_forward: *forward,
            query: Some(TargetQuery::Ray(Ray3d::new(position, forward))),
            beam_origin: None,
        }
    }
}

struct Suspension {
    id: EntityId,
    original: Transform,
}

struct QuickInfo {
    target: Target,
    remaining: f32,
}

// ============================================================================
// MODE HANDLERS
// ============================================================================

type ModeHook = fn(&mut StaffInteractionController, &mut WorldObjects);

/// Enter/exit hooks run by every transition
struct ModeHandlers {
    enter: ModeHook,
    exit: ModeHook,
}

fn handlers(mode: InteractionMode) -> ModeHandlers {
    match mode {
        InteractionMode::Idle => ModeHandlers { enter: enter_idle, exit: no_op },
        InteractionMode::Aiming => ModeHandlers { enter: no_op, exit: exit_aiming },
        InteractionMode::Menu => ModeHandlers { enter: enter_menu, exit: exit_menu },
        InteractionMode::Grabbing => ModeHandlers { enter: drop_highlight, exit: exit_grabbing },
        InteractionMode::Drawing => ModeHandlers { enter: drop_highlight, exit: exit_drawing },
        InteractionMode::Moving => ModeHandlers { enter: drop_highlight, exit: exit_moving },
    }
}

fn no_op(_: &mut StaffInteractionController, _: &mut WorldObjects) {}

fn enter_idle(c: &mut StaffInteractionController, _: &mut WorldObjects) {
    c.state.target = None;
    c.state.hold_start_time = None;
    c.state.grabbed_entity_id = None;
}

fn exit_aiming(c: &mut StaffInteractionController, _: &mut WorldObjects) {
    c.state.hold_start_time = None;
}

fn enter_menu(c: &mut StaffInteractionController, objects: &mut WorldObjects) {
    let Some(target) = c.state.target.clone() else {
        warn!("Menu opened without a target");
        return;
    };
    c.menu = Some(ContextMenu::open(target.kind, c.config.menu_dead_zone, true));
    if let (TargetKind::Minion, Some(id)) = (target.kind, target.id.as_deref()) {
        c.suspend(id, objects);
    }
}

fn exit_menu(c: &mut StaffInteractionController, objects: &mut WorldObjects) {
    c.menu = None;
    c.restore_suspension(objects);
}

fn drop_highlight(c: &mut StaffInteractionController, _: &mut WorldObjects) {
    c.targeting.clear_highlight();
}

fn exit_grabbing(c: &mut StaffInteractionController, objects: &mut WorldObjects) {
    if c.grabber.is_active() {
        c.grabber.cancel(objects);
    }
    c.state.grabbed_entity_id = None;
}

fn exit_drawing(c: &mut StaffInteractionController, _: &mut WorldObjects) {
    if c.drawer.is_active() {
        c.drawer.cancel_drawing();
    }
}

fn exit_moving(c: &mut StaffInteractionController, objects: &mut WorldObjects) {
    if c.mover.is_active() {
        warn!("Leaving move mode mid-animation, dropping the move");
        c.mover.abort(objects);
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

#[derive(Resource)]
pub struct StaffInteractionController {
    config: InteractionConfig,
    state: InteractionState,
    targeting: TargetingSystem,
    grabber: ForceGrabController,
    drawer: FoundationDrawer,
    mover: BuildingMoveController,
    menu: Option<ContextMenu>,
    suspended: Option<Suspension>,
    quick_info: Option<QuickInfo>,
    beam: BeamState,
    camera_position: Vec3,
    outbox: Vec<InteractionEvent>,
}

impl StaffInteractionController {
    pub fn new(config: InteractionConfig, isometric: bool) -> Self {
        Self {
            targeting: TargetingSystem::new(config.picking, isometric),
            grabber: ForceGrabController::new(config.spring, config.throw_force, config.throw_upward_bias),
            drawer: FoundationDrawer::new(config.grid),
            mover: BuildingMoveController::new(config.movement, config.grid.cell_size),
            config,
            state: InteractionState::default(),
            menu: None,
            suspended: None,
            quick_info: None,
            beam: BeamState::default(),
            camera_position: Vec3::ZERO,
            outbox: Vec::new(),
        }
    }

    /// Replace the grab controller's RNG with a seeded one
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.grabber = ForceGrabController::new(self.config.spring, self.config.throw_force, self.config.throw_upward_bias)
            .with_seed(seed);
        self
    }

    pub fn mode(&self) -> InteractionMode {
        self.state.mode
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn target(&self) -> Option<&Target> {
        self.state.target.as_ref()
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn beam(&self) -> &BeamState {
        &self.beam
    }

    pub fn targeting(&self) -> &TargetingSystem {
        &self.targeting
    }

    pub fn grabber(&self) -> &ForceGrabController {
        &self.grabber
    }

    pub fn drawer(&self) -> &FoundationDrawer {
        &self.drawer
    }

    pub(crate) fn drawer_mut(&mut self) -> &mut FoundationDrawer {
        &mut self.drawer
    }

    pub fn mover(&self) -> &BuildingMoveController {
        &self.mover
    }

    pub fn quick_info(&self) -> Option<&Target> {
        self.quick_info.as_ref().map(|q| &q.target)
    }

    /// Entity that should carry the highlight material right now
    pub fn highlighted_entity(&self) -> Option<Entity> {
        self.targeting.highlight().current_entity()
    }

    pub fn set_isometric(&mut self, isometric: bool) {
        self.targeting.set_isometric(isometric);
    }

    /// Drain queued outbound events
    pub fn take_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        additive: bool,
        now: f32,
        view: &ViewContext,
        objects: &mut WorldObjects,
    ) {
        self.camera_position = view.camera_position;
        match (self.state.mode, button) {
            (InteractionMode::Idle, PointerButton::Primary) => {
                let Some(query) = view.query.as_ref() else { return };
                let Some(target) = self.targeting.resolve(objects, query) else {
                    debug!("Press resolved no target");
                    return;
                };
                self.state.target = Some(target);
                self.state.hold_start_time = Some(now);
                self.transition(InteractionMode::Aiming, objects);
            }
            (InteractionMode::Menu, PointerButton::Primary) => self.confirm_highlighted(objects),
            (InteractionMode::Menu, PointerButton::Secondary) => {
                self.transition(InteractionMode::Idle, objects);
            }
            (InteractionMode::Grabbing, PointerButton::Primary) => self.throw_grabbed(view, objects),
            (InteractionMode::Grabbing, PointerButton::Secondary) => self.drop_grabbed(objects),
            (InteractionMode::Drawing, PointerButton::Primary) => {
                let Some(point) = self.ground_point(objects, view) else { return };
                let heights = ground_heights(objects);
                self.drawer.handle_pointer_down(point, additive, heights.as_ref());
            }
            (InteractionMode::Drawing, PointerButton::Secondary) => {
                self.drawer.cancel_drawing();
                self.transition(InteractionMode::Idle, objects);
            }
            (InteractionMode::Moving, PointerButton::Primary) => {
                if self.mover.phase() == MovePhase::Moving {
                    self.mover.commit(objects);
                }
            }
            (InteractionMode::Moving, PointerButton::Secondary) => {
                self.mover.cancel();
            }
            _ => {}
        }
    }

    pub fn pointer_up(&mut self, button: PointerButton, now: f32, view: &ViewContext, objects: &mut WorldObjects) {
        self.camera_position = view.camera_position;
        if button != PointerButton::Primary {
            return;
        }
        match self.state.mode {
            InteractionMode::Aiming => {
                let held = self.state.hold_start_time.map(|start| now - start).unwrap_or(0.0);
                if held < self.config.hold_threshold {
                    if let Some(target) = self.state.target.clone() {
                        self.show_quick_info(target);
                    }
                    self.transition(InteractionMode::Idle, objects);
                } else if self.transition(InteractionMode::Menu, objects) {
                    // Released on the frame the menu opened: nothing chosen yet
                    if let Some(menu) = self.menu.as_mut() {
                        menu.held = false;
                    }
                }
            }
            InteractionMode::Menu => {
                let Some(menu) = self.menu.as_mut() else { return };
                if !menu.held {
                    return;
                }
                menu.held = false;
                if menu.highlighted().is_some() {
                    self.confirm_highlighted(objects);
                }
            }
            InteractionMode::Drawing => {
                let Some(point) = self.ground_point(objects, view) else { return };
                let heights = ground_heights(objects);
                self.drawer.handle_pointer_up(point, heights.as_ref());
            }
            _ => {}
        }
    }

    /// Raw pointer motion, used for look-based menu selection
    pub fn pointer_motion(&mut self, delta: Vec2) {
        if self.state.mode != InteractionMode::Menu {
            return;
        }
        if let Some(menu) = self.menu.as_mut() {
            menu.accumulate_look(delta);
        }
    }

    pub fn key_down(&mut self, key: StaffKey, objects: &mut WorldObjects) {
        match (self.state.mode, key) {
            (InteractionMode::Menu, StaffKey::Confirm) => self.confirm_highlighted(objects),
            (InteractionMode::Drawing, StaffKey::Confirm) => self.finalize_drawing(objects),
            (InteractionMode::Aiming | InteractionMode::Menu, StaffKey::Cancel) => {
                self.transition(InteractionMode::Idle, objects);
            }
            (InteractionMode::Grabbing, StaffKey::Cancel) => {
                self.grabber.cancel(objects);
                self.transition(InteractionMode::Idle, objects);
            }
            (InteractionMode::Drawing, StaffKey::Cancel) => {
                self.drawer.cancel_drawing();
                self.transition(InteractionMode::Idle, objects);
            }
            (InteractionMode::Moving, StaffKey::Cancel) => {
                self.mover.cancel();
            }
            _ => {}
        }
    }

    /// Confirm a menu action directly. Actions outside the open menu are ignored.
    pub fn select_menu_action(&mut self, action: MenuAction, objects: &mut WorldObjects) -> bool {
        if self.state.mode != InteractionMode::Menu {
            debug!("{:?} ignored outside the menu", action);
            return false;
        }
        let Some(menu) = self.menu.as_ref() else { return false };
        if !menu.contains(action) {
            debug!("{:?} is not offered for {:?}", action, menu.kind());
            return false;
        }
        let Some(target) = self.state.target.clone() else { return false };

        info!("Menu action {} on {:?} {:?}", action.label(), target.kind, target.id);
        self.outbox.push(InteractionEvent::MenuActionSelected {
            action,
            target_kind: target.kind,
            target_id: target.id.clone(),
        });

        // The suspension claim must be gone before grab/move claim the entity
        self.restore_suspension(objects);

        match action {
            MenuAction::Grab => {
                let grabbed = target.id.as_deref().is_some_and(|id| self.grabber.grab(id, objects));
                if grabbed {
                    self.state.grabbed_entity_id = target.id.clone();
                    self.transition(InteractionMode::Grabbing, objects);
                } else {
                    self.transition(InteractionMode::Idle, objects);
                }
            }
            MenuAction::Move => {
                let started = target.id.as_deref().is_some_and(|id| self.mover.start_move(id, objects));
                let next = if started { InteractionMode::Moving } else { InteractionMode::Idle };
                self.transition(next, objects);
            }
            MenuAction::Build => {
                let heights = ground_heights(objects);
                self.drawer.start_drawing(target.world_position, heights.as_ref());
                self.transition(InteractionMode::Drawing, objects);
            }
            MenuAction::SpawnMinion => {
                self.outbox.push(InteractionEvent::SpawnRequested {
                    position: target.world_position,
                });
                self.transition(InteractionMode::Idle, objects);
            }
            // Informational: listeners act on the event, the staff goes back to idle
            MenuAction::Chat
            | MenuAction::Quest
            | MenuAction::Details
            | MenuAction::Workers
            | MenuAction::Aesthetic
            | MenuAction::Status => {
                self.transition(InteractionMode::Idle, objects);
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------------

    pub fn update(&mut self, now: f32, dt: f32, view: &ViewContext, objects: &mut WorldObjects) {
        self.camera_position = view.camera_position;

        if self.state.mode == InteractionMode::Idle {
            match view.query.as_ref() {
                Some(query) => {
                    self.targeting.resolve(objects, query);
                }
                None => self.targeting.clear_highlight(),
            }
        }

        if self.state.mode == InteractionMode::Aiming {
            let held = self.state.hold_start_time.map(|start| now - start).unwrap_or(0.0);
            if held >= self.config.hold_threshold {
                self.transition(InteractionMode::Menu, objects);
            }
        }

        match self.state.mode {
            InteractionMode::Grabbing => self.update_grab(dt, view, objects),
            InteractionMode::Drawing => {
                if let Some(point) = self.ground_point(objects, view) {
                    let heights = ground_heights(objects);
                    self.drawer.update_pointer(point, heights.as_ref());
                }
            }
            InteractionMode::Moving => self.update_move(dt, view, objects),
            _ => {}
        }

        self.tick_quick_info(dt);

        let origin = view
            .beam_origin
            .unwrap_or_else(|| beam::fallback_origin(view.camera_position, view.camera_forward));
        let end = self.beam_end(objects, view);
        self.beam.update(self.state.mode, origin, end);
    }

    /// Remove an entity from the registry, unwinding anything that referenced it
    pub fn unregister_entity(&mut self, id: &str, objects: &mut WorldObjects) -> Option<RegisteredEntity> {
        let removed = objects.unregister_entity(id)?;
        self.targeting.forget(id);

        let mut involved = false;
        if self.grabber.grabbed_id() == Some(id) {
            self.grabber.abandon();
            involved = true;
        }
        if self.mover.building_id() == Some(id) {
            self.mover.abort(objects);
            involved = true;
        }
        if self.suspended.as_ref().is_some_and(|s| s.id == id) {
            self.suspended = None;
            involved = true;
        }
        if self.state.target.as_ref().and_then(|t| t.id.as_deref()) == Some(id) {
            involved = true;
        }
        if self.quick_info.as_ref().and_then(|q| q.target.id.as_deref()) == Some(id) {
            self.quick_info = None;
            self.outbox.push(InteractionEvent::QuickInfoHidden);
        }

        if involved && self.state.mode != InteractionMode::Idle {
            warn!("{} was removed while in {:?}, returning to idle", id, self.state.mode);
            self.transition(InteractionMode::Idle, objects);
        }
        Some(removed)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn transition(&mut self, to: InteractionMode, objects: &mut WorldObjects) -> bool {
        let from = self.state.mode;
        if from == to {
            return true;
        }
        if !from.can_transition(to) {
            debug!("Illegal mode transition {:?} -> {:?}", from, to);
            return false;
        }
        (handlers(from).exit)(self, objects);
        self.state.mode = to;
        (handlers(to).enter)(self, objects);
        info!("Interaction mode {:?} -> {:?}", from, to);
        self.outbox.push(InteractionEvent::ModeChanged(to));
        true
    }

    fn confirm_highlighted(&mut self, objects: &mut WorldObjects) {
        if let Some(action) = self.menu.as_ref().and_then(|m| m.highlighted()) {
            self.select_menu_action(action, objects);
        }
    }

    fn ground_point(&self, objects: &WorldObjects, view: &ViewContext) -> Option<Vec3> {
        view.query.as_ref().and_then(|q| self.targeting.ground_point(objects, q))
    }

    fn throw_grabbed(&mut self, view: &ViewContext, objects: &mut WorldObjects) {
        if let Some(result) = self.grabber.throw(view.camera_forward, objects) {
            self.outbox.push(InteractionEvent::EntityThrown(result));
        }
        self.transition(InteractionMode::Idle, objects);
    }

    fn drop_grabbed(&mut self, objects: &mut WorldObjects) {
        if let Some(id) = self.grabber.grabbed_id().map(str::to_string) {
            if let Some(velocity) = self.grabber.release(Some(Vec3::ZERO), objects) {
                self.outbox.push(InteractionEvent::EntityReleased { id, velocity });
            }
        }
        self.transition(InteractionMode::Idle, objects);
    }

    fn finalize_drawing(&mut self, objects: &mut WorldObjects) {
        if let Some(foundation) = self.drawer.finish_drawing() {
            self.outbox.push(InteractionEvent::FoundationCompleted(foundation));
        }
        self.transition(InteractionMode::Idle, objects);
    }

    fn update_grab(&mut self, dt: f32, view: &ViewContext, objects: &mut WorldObjects) {
        if !self.grabber.is_active() {
            self.transition(InteractionMode::Idle, objects);
            return;
        }
        let target = if self.targeting.is_isometric() {
            self.ground_point(objects, view)
                .map(|p| p + Vec3::Y * self.config.grab_hover_height)
        } else {
            Some(view.camera_position + view.camera_forward.normalize_or_zero() * self.config.grab_distance)
        };
        if let Some(target) = target {
            self.grabber.update_target(target);
        }
        self.grabber.update(dt, objects);
    }

    fn update_move(&mut self, dt: f32, view: &ViewContext, objects: &mut WorldObjects) {
        if let Some(point) = self.ground_point(objects, view) {
            self.mover.update_pointer(point, objects);
        }
        if let Some(outcome) = self.mover.update(dt, objects) {
            self.outbox.push(InteractionEvent::BuildingMoveFinished(outcome));
            self.transition(InteractionMode::Idle, objects);
        } else if !self.mover.is_active() {
            self.transition(InteractionMode::Idle, objects);
        }
    }

    fn beam_end(&self, objects: &WorldObjects, view: &ViewContext) -> Option<Vec3> {
        match self.state.mode {
            InteractionMode::Idle => None,
            InteractionMode::Aiming | InteractionMode::Menu => self.state.target.as_ref().map(|t| t.world_position),
            InteractionMode::Grabbing => self.grabber.position(),
            InteractionMode::Drawing => self.drawer.cursor_position().or_else(|| self.ground_point(objects, view)),
            InteractionMode::Moving => self
                .mover
                .ghost()
                .map(|g| g.center)
                .or_else(|| self.mover.building_id().and_then(|id| objects.get(id)).map(|e| e.transform.translation)),
        }
    }

    fn show_quick_info(&mut self, target: Target) {
        if self.quick_info.is_some() {
            self.outbox.push(InteractionEvent::QuickInfoHidden);
        }
        debug!("Quick info for {:?} {:?}", target.kind, target.id);
        self.outbox.push(InteractionEvent::QuickInfoShown(target.clone()));
        self.quick_info = Some(QuickInfo {
            target,
            remaining: self.config.quick_info_duration,
        });
    }

    fn tick_quick_info(&mut self, dt: f32) {
        let Some(info) = self.quick_info.as_mut() else { return };
        info.remaining -= dt;
        if info.remaining <= 0.0 {
            self.quick_info = None;
            self.outbox.push(InteractionEvent::QuickInfoHidden);
        }
    }

    /// Turn a considered minion toward the camera; the exact pose comes back on restore
    fn suspend(&mut self, id: &str, objects: &mut WorldObjects) {
        let Some(original) = objects.get(id).map(|e| e.transform) else { return };
        if !objects.try_claim(id, Claim::Suspend) {
            return;
        }
        let to_camera = (self.camera_position - original.translation) * Vec3::new(1.0, 0.0, 1.0);
        let facing = if to_camera.length_squared() > 1e-6 {
            Quat::from_rotation_y(to_camera.x.atan2(to_camera.z))
        } else {
            original.rotation
        };
        let mut pose = original;
        pose.rotation = facing * Quat::from_rotation_x(-SUSPEND_TILT);
        objects.write_transform(id, Claim::Suspend, pose);
        debug!("Suspended {}", id);
        self.suspended = Some(Suspension {
            id: id.to_string(),
            original,
        });
    }

    fn restore_suspension(&mut self, objects: &mut WorldObjects) {
        let Some(suspension) = self.suspended.take() else { return };
        objects.write_transform(&suspension.id, Claim::Suspend, suspension.original);
        objects.release_claim(&suspension.id, Claim::Suspend);
        debug!("Released suspension of {}", suspension.id);
    }
}

impl FromWorld for StaffInteractionController {
    fn from_world(world: &mut World) -> Self {
        let config = world.get_resource_or_init::<InteractionConfig>().clone();
        let isometric = world.get_resource_or_init::<ViewSettings>().isometric;
        Self::new(config, isometric)
    }
}

fn ground_heights(objects: &WorldObjects) -> Arc<dyn HeightSampler> {
    match objects.ground() {
        Some(ground) => ground.heights.clone(),
        None => Arc::new(FlatGround(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityMetadata;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> WorldObjects {
        let mut objects = WorldObjects::default();
        objects.set_ground_surface(None, FlatGround(0.0));
        objects
            .register_minion("gob", Entity::from_raw(1), EntityMetadata::named("Gob"))
            .place(Transform::from_xyz(0.0, 1.0, -10.0))
            .with_half_extents(Vec3::new(0.4, 0.8, 0.4));
        objects
            .register_building("hall", Entity::from_raw(2), EntityMetadata::named("Hall"))
            .place(Transform::from_xyz(20.0, 2.0, 0.0))
            .with_half_extents(Vec3::new(2.0, 2.0, 2.0));
        objects
    }

    fn controller() -> StaffInteractionController {
        StaffInteractionController::new(InteractionConfig::default(), false).with_seed(11)
    }

    fn at_minion() -> ViewContext<'static> {
        ViewContext::first_person(Vec3::new(0.0, 1.0, 0.0), Dir3::NEG_Z)
    }

    fn looking_down_at(x: f32, z: f32) -> ViewContext<'static> {
        ViewContext::first_person(Vec3::new(x, 10.0, z), Dir3::NEG_Y)
    }

    /// Press, hold past the threshold and let go with nothing chosen
    fn open_menu(c: &mut StaffInteractionController, view: &ViewContext, objects: &mut WorldObjects) {
        c.pointer_down(PointerButton::Primary, false, 0.0, view, objects);
        assert_eq!(c.mode(), InteractionMode::Aiming);
        c.update(0.25, DT, view, objects);
        assert_eq!(c.mode(), InteractionMode::Menu);
        c.pointer_up(PointerButton::Primary, 0.3, view, objects);
        assert_eq!(c.mode(), InteractionMode::Menu);
    }

    fn modes(events: &[InteractionEvent]) -> Vec<InteractionMode> {
        events
            .iter()
            .filter_map(|e| match e {
                InteractionEvent::ModeChanged(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tap_shows_quick_info_then_hides() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        c.pointer_down(PointerButton::Primary, false, 0.0, &view, &mut objects);
        c.update(0.1, DT, &view, &mut objects);
        c.pointer_up(PointerButton::Primary, 0.1, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        assert_eq!(c.quick_info().and_then(|t| t.id.as_deref()), Some("gob"));

        let events = c.take_events();
        assert_eq!(modes(&events), vec![InteractionMode::Aiming, InteractionMode::Idle]);
        assert!(events.iter().any(|e| matches!(e, InteractionEvent::QuickInfoShown(t) if t.kind == TargetKind::Minion)));

        c.update(0.2, 2.6, &view, &mut objects);
        assert!(c.quick_info().is_none());
        assert!(c.take_events().contains(&InteractionEvent::QuickInfoHidden));
    }

    #[test]
    fn test_press_on_nothing_stays_idle() {
        let mut objects = world();
        let mut c = controller();
        // Horizontal ray away from both entities that never meets the ground
        let view = ViewContext::first_person(Vec3::new(0.0, 1.0, 0.0), Dir3::NEG_X);
        c.pointer_down(PointerButton::Primary, false, 0.0, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn test_hold_opens_minion_menu_and_suspends() {
        let mut objects = world();
        let mut c = controller();
        open_menu(&mut c, &at_minion(), &mut objects);

        let menu = c.menu().expect("menu open");
        assert_eq!(menu.kind(), TargetKind::Minion);
        assert_eq!(objects.get("gob").and_then(|e| e.claim()), Some(Claim::Suspend));
        assert_ne!(objects.get("gob").map(|e| e.transform.rotation), Some(Quat::IDENTITY));
        assert!(c.beam().visible);

        c.key_down(StaffKey::Cancel, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        let gob = objects.get("gob").expect("registered");
        assert_eq!(gob.claim(), None);
        assert_eq!(gob.transform.rotation, Quat::IDENTITY);
        assert_eq!(gob.transform.translation, Vec3::new(0.0, 1.0, -10.0));
    }

    #[test]
    fn test_grab_then_throw() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        open_menu(&mut c, &view, &mut objects);
        assert!(c.select_menu_action(MenuAction::Grab, &mut objects));
        assert_eq!(c.mode(), InteractionMode::Grabbing);
        assert_eq!(c.state().grabbed_entity_id.as_deref(), Some("gob"));
        assert_eq!(objects.get("gob").and_then(|e| e.claim()), Some(Claim::Grab));

        for i in 0..120 {
            c.update(0.3 + i as f32 * DT, DT, &view, &mut objects);
        }
        // Floats toward camera + forward * grab distance
        let pos = objects.get("gob").map(|e| e.transform.translation).unwrap_or_default();
        assert!((pos - Vec3::new(0.0, 1.0, -6.0)).length() < 0.1, "{:?}", pos);

        c.take_events();
        c.pointer_down(PointerButton::Primary, false, 3.0, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        let events = c.take_events();
        let thrown = events.iter().find_map(|e| match e {
            InteractionEvent::EntityThrown(t) => Some(t.clone()),
            _ => None,
        });
        let thrown = thrown.expect("throw event");
        assert_eq!(thrown.id, "gob");
        assert!(thrown.velocity.z < 0.0 && thrown.velocity.y > 0.0);
        assert!(thrown.velocity.z.abs() > thrown.velocity.y);
        assert!((thrown.velocity.length() - 18.0).abs() < 1e-3);
        assert_eq!(objects.get("gob").and_then(|e| e.claim()), None);
    }

    #[test]
    fn test_secondary_click_drops_in_place() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        open_menu(&mut c, &view, &mut objects);
        c.select_menu_action(MenuAction::Grab, &mut objects);
        c.update(0.4, DT, &view, &mut objects);
        c.take_events();

        c.pointer_down(PointerButton::Secondary, false, 0.5, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        assert!(c.take_events().contains(&InteractionEvent::EntityReleased {
            id: "gob".to_string(),
            velocity: Vec3::ZERO,
        }));
    }

    #[test]
    fn test_escape_while_grabbing_restores_original() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        open_menu(&mut c, &view, &mut objects);
        c.select_menu_action(MenuAction::Grab, &mut objects);
        for i in 0..30 {
            c.update(0.3 + i as f32 * DT, DT, &view, &mut objects);
        }
        c.key_down(StaffKey::Cancel, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        let gob = objects.get("gob").expect("registered");
        assert_eq!(gob.transform.translation, Vec3::new(0.0, 1.0, -10.0));
        assert_eq!(gob.transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_actions_outside_menu_are_ignored() {
        let mut objects = world();
        let mut c = controller();
        assert!(!c.select_menu_action(MenuAction::Grab, &mut objects));

        open_menu(&mut c, &at_minion(), &mut objects);
        assert!(!c.select_menu_action(MenuAction::Move, &mut objects));
        assert!(!c.select_menu_action(MenuAction::Build, &mut objects));
        assert_eq!(c.mode(), InteractionMode::Menu);

        c.take_events();
        assert!(c.select_menu_action(MenuAction::Chat, &mut objects));
        assert_eq!(c.mode(), InteractionMode::Idle);
        let events = c.take_events();
        assert!(events.contains(&InteractionEvent::MenuActionSelected {
            action: MenuAction::Chat,
            target_kind: TargetKind::Minion,
            target_id: Some("gob".to_string()),
        }));
        assert_eq!(objects.get("gob").and_then(|e| e.claim()), None);
    }

    #[test]
    fn test_look_selection_confirms_on_release() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        c.pointer_down(PointerButton::Primary, false, 0.0, &view, &mut objects);
        c.update(0.25, DT, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Menu);

        // Look up: slot 0 is Grab
        c.pointer_motion(Vec2::new(0.0, -40.0));
        assert_eq!(c.menu().and_then(|m| m.highlighted()), Some(MenuAction::Grab));
        c.pointer_up(PointerButton::Primary, 0.4, &view, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Grabbing);
    }

    #[test]
    fn test_ground_menu_spawn_request() {
        let mut objects = world();
        let mut c = controller();
        let view = looking_down_at(6.0, 4.0);
        open_menu(&mut c, &view, &mut objects);
        assert_eq!(c.menu().map(|m| m.kind()), Some(TargetKind::Ground));
        c.take_events();

        assert!(c.select_menu_action(MenuAction::SpawnMinion, &mut objects));
        let events = c.take_events();
        let position = events.iter().find_map(|e| match e {
            InteractionEvent::SpawnRequested { position } => Some(*position),
            _ => None,
        });
        let position = position.expect("spawn requested");
        assert!((position - Vec3::new(6.0, 0.0, 4.0)).length() < 1e-3);
        assert_eq!(c.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_draw_foundation_and_confirm() {
        let mut objects = world();
        let mut c = controller();
        open_menu(&mut c, &looking_down_at(0.0, 0.0), &mut objects);
        assert!(c.select_menu_action(MenuAction::Build, &mut objects));
        assert_eq!(c.mode(), InteractionMode::Drawing);

        c.pointer_down(PointerButton::Primary, false, 1.0, &looking_down_at(0.0, 0.0), &mut objects);
        c.update(1.0, DT, &looking_down_at(4.0, 0.0), &mut objects);
        c.pointer_up(PointerButton::Primary, 1.1, &looking_down_at(8.0, 0.0), &mut objects);
        assert_eq!(c.drawer().selected_count(), 5);
        c.take_events();

        c.key_down(StaffKey::Confirm, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        let events = c.take_events();
        let foundation = events.iter().find_map(|e| match e {
            InteractionEvent::FoundationCompleted(f) => Some(f.clone()),
            _ => None,
        });
        let foundation = foundation.expect("foundation completed");
        assert_eq!(foundation.area, 5);
        assert!(!c.drawer().is_active());
    }

    #[test]
    fn test_short_drawing_confirms_to_nothing() {
        let mut objects = world();
        let mut c = controller();
        open_menu(&mut c, &looking_down_at(0.0, 0.0), &mut objects);
        c.select_menu_action(MenuAction::Build, &mut objects);
        c.pointer_down(PointerButton::Primary, false, 1.0, &looking_down_at(0.0, 0.0), &mut objects);
        c.pointer_up(PointerButton::Primary, 1.1, &looking_down_at(2.0, 0.0), &mut objects);
        c.take_events();

        c.key_down(StaffKey::Confirm, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Idle);
        let events = c.take_events();
        assert!(!events.iter().any(|e| matches!(e, InteractionEvent::FoundationCompleted(_))));
        assert_eq!(c.drawer().selected_count(), 0);
    }

    #[test]
    fn test_move_building_commit() {
        let mut objects = world();
        let mut c = controller();
        open_menu(&mut c, &looking_down_at(20.0, 0.0), &mut objects);
        assert_eq!(c.menu().map(|m| m.kind()), Some(TargetKind::Building));
        assert!(c.select_menu_action(MenuAction::Move, &mut objects));
        assert_eq!(c.mode(), InteractionMode::Moving);

        let dest = looking_down_at(30.0, 0.0);
        for _ in 0..40 {
            c.update(1.0, DT, &dest, &mut objects);
        }
        assert_eq!(c.mover().phase(), MovePhase::Moving);
        c.pointer_down(PointerButton::Primary, false, 2.0, &dest, &mut objects);
        assert_eq!(c.mover().phase(), MovePhase::Committing);
        c.take_events();

        for _ in 0..300 {
            c.update(2.0, DT, &dest, &mut objects);
            if c.mode() == InteractionMode::Idle {
                break;
            }
        }
        assert_eq!(c.mode(), InteractionMode::Idle);
        let events = c.take_events();
        let finished: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                InteractionEvent::BuildingMoveFinished(o) => Some(o.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 1);
        assert!(finished[0].committed);
        assert_eq!(finished[0].grid, IVec2::new(15, 0));
        assert_eq!(objects.get("hall").map(|e| e.transform.translation), Some(Vec3::new(30.0, 2.0, 0.0)));
    }

    #[test]
    fn test_move_cancel_waits_for_animation() {
        let mut objects = world();
        let mut c = controller();
        open_menu(&mut c, &looking_down_at(20.0, 0.0), &mut objects);
        c.select_menu_action(MenuAction::Move, &mut objects);
        let dest = looking_down_at(30.0, 0.0);
        for _ in 0..10 {
            c.update(1.0, DT, &dest, &mut objects);
        }

        c.key_down(StaffKey::Cancel, &mut objects);
        assert_eq!(c.mode(), InteractionMode::Moving);
        assert_eq!(c.mover().phase(), MovePhase::Cancelling);
        for _ in 0..300 {
            c.update(1.5, DT, &dest, &mut objects);
            if c.mode() == InteractionMode::Idle {
                break;
            }
        }
        assert_eq!(c.mode(), InteractionMode::Idle);
        assert_eq!(objects.get("hall").map(|e| e.transform.translation), Some(Vec3::new(20.0, 2.0, 0.0)));
        assert_eq!(objects.get("hall").and_then(|e| e.claim()), None);
    }

    #[test]
    fn test_unregistering_grabbed_entity_returns_to_idle() {
        let mut objects = world();
        let mut c = controller();
        let view = at_minion();
        open_menu(&mut c, &view, &mut objects);
        c.select_menu_action(MenuAction::Grab, &mut objects);
        c.update(0.4, DT, &view, &mut objects);

        assert!(c.unregister_entity("gob", &mut objects).is_some());
        assert_eq!(c.mode(), InteractionMode::Idle);
        assert!(!c.grabber().is_active());
        assert!(!objects.contains("gob"));
        assert!(c.unregister_entity("gob", &mut objects).is_none());

        // Still usable afterwards
        c.update(0.5, DT, &view, &mut objects);
        assert!(!c.beam().visible);
    }

    #[test]
    fn test_idle_update_tracks_highlight() {
        let mut objects = world();
        let mut c = controller();
        c.update(0.0, DT, &at_minion(), &mut objects);
        assert_eq!(c.highlighted_entity(), Some(Entity::from_raw(1)));
        c.update(0.1, DT, &looking_down_at(5.0, 5.0), &mut objects);
        assert_eq!(c.highlighted_entity(), None);
    }
}
