// Building relocation - lift, hover, land or return
//
// One move at a time. The building is claimed for the whole session and every
// exit path (commit, cancel, abort) gives the claim back exactly once.

pub mod ghost;

use bevy::prelude::*;

use crate::config::MoveConfig;
use crate::foundation::{cell_center, snap_to_grid};
use crate::math_utils::move_towards;
use crate::registry::{Claim, WorldObjects};
use crate::types::{EntityId, TargetKind};

pub use ghost::GhostPreview;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum MovePhase {
    #[default]
    Idle,
    Lifting,
    Moving,
    Committing,
    Cancelling,
}

/// Session data, alive from `start_move` until the building lands
#[derive(Clone, Debug)]
pub struct BuildingMoveState {
    pub building_id: EntityId,
    pub handle: Entity,
    pub original_transform: Transform,
    pub original_position: Vec3,
    pub target_position: Vec3,
    pub target_cell: IVec2,
    pub footprint: Vec2,
    pub ground_offset: f32,   // Origin height above the terrain, kept on landing
    pub placement_valid: bool,
}

/// Reported once when a move session ends
#[derive(Clone, Debug, PartialEq)]
pub struct MoveOutcome {
    pub building_id: EntityId,
    pub grid: IVec2,
    pub position: Vec3,
    pub committed: bool,
}

pub struct BuildingMoveController {
    config: MoveConfig,
    cell_size: f32,
    phase: MovePhase,
    state: Option<BuildingMoveState>,
    lift_elapsed: f32,
}

impl BuildingMoveController {
    pub fn new(config: MoveConfig, cell_size: f32) -> Self {
        Self {
            config,
            cell_size,
            phase: MovePhase::Idle,
            state: None,
            lift_elapsed: 0.0,
        }
    }

    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != MovePhase::Idle
    }

    pub fn state(&self) -> Option<&BuildingMoveState> {
        self.state.as_ref()
    }

    pub fn building_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.building_id.as_str())
    }

    /// Claim a registered building and start lifting it
    pub fn start_move(&mut self, id: &str, objects: &mut WorldObjects) -> bool {
        if self.phase != MovePhase::Idle {
            debug!("Move already in progress, ignoring start for {}", id);
            return false;
        }
        let Some(entity) = objects.get(id) else {
            warn!("Cannot move unknown entity {}", id);
            return false;
        };
        if entity.kind != TargetKind::Building {
            debug!("{} is not a building, ignoring move", id);
            return false;
        }
        let handle = entity.handle;
        let transform = entity.transform;
        // Footprint comes from the live world-space bounds, not building metadata
        let footprint = entity.footprint();
        if !objects.try_claim(id, Claim::Move) {
            return false;
        }

        let position = transform.translation;
        let ground_offset = position.y - objects.height_at(position.x, position.z).unwrap_or(position.y);
        self.state = Some(BuildingMoveState {
            building_id: id.to_string(),
            handle,
            original_transform: transform,
            original_position: position,
            target_position: position,
            target_cell: snap_to_grid(position, self.cell_size),
            footprint,
            ground_offset,
            placement_valid: true,
        });
        self.lift_elapsed = 0.0;
        self.phase = MovePhase::Lifting;
        info!("Lifting building {} (footprint {:?})", id, footprint);
        true
    }

    /// Snap the landing target under the pointer's ground point
    pub fn update_pointer(&mut self, ground_point: Vec3, objects: &WorldObjects) {
        if !matches!(self.phase, MovePhase::Lifting | MovePhase::Moving) {
            return;
        }
        let Some(state) = self.state.as_mut() else { return };
        let cell = snap_to_grid(ground_point, self.cell_size);
        let center = cell_center(cell, self.cell_size);
        let y = objects.height_at(center.x, center.y).unwrap_or(ground_point.y) + state.ground_offset;

        state.target_cell = cell;
        state.target_position = Vec3::new(center.x, y, center.y);
        state.placement_valid =
            !ghost::placement_blocked(objects, &state.building_id, state.target_position, state.footprint);
    }

    /// Start landing on the current target. Rejected outside `Moving` or over a blocked spot.
    pub fn commit(&mut self, objects: &WorldObjects) -> bool {
        if self.phase != MovePhase::Moving {
            debug!("Commit ignored in phase {:?}", self.phase);
            return false;
        }
        let Some(state) = self.state.as_mut() else { return false };
        state.placement_valid =
            !ghost::placement_blocked(objects, &state.building_id, state.target_position, state.footprint);
        if !state.placement_valid {
            debug!("Placement for {} is blocked, commit rejected", state.building_id);
            return false;
        }
        info!("Committing building {} to cell {:?}", state.building_id, state.target_cell);
        self.phase = MovePhase::Committing;
        true
    }

    /// Any live phase animates back to the original position
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            MovePhase::Lifting | MovePhase::Moving | MovePhase::Committing => {
                if let Some(state) = &self.state {
                    info!("Cancelling move of {}", state.building_id);
                }
                self.phase = MovePhase::Cancelling;
                true
            }
            MovePhase::Idle | MovePhase::Cancelling => false,
        }
    }

    /// Advance the phase animation; returns the outcome on the frame the building lands
    pub fn update(&mut self, dt: f32, objects: &mut WorldObjects) -> Option<MoveOutcome> {
        let state = self.state.as_ref()?;
        let id = state.building_id.clone();
        let Some(current) = objects.get(&id).map(|e| e.transform) else {
            warn!("Building {} vanished mid-move", id);
            self.reset();
            return None;
        };
        let lifted_y = state.original_position.y + self.config.lift_height;

        match self.phase {
            MovePhase::Idle => None,
            MovePhase::Lifting => {
                self.lift_elapsed += dt;
                let t = (self.lift_elapsed / self.config.lift_duration.max(f32::EPSILON)).min(1.0);
                let eased = t * t * (3.0 - 2.0 * t);
                let mut transform = current;
                transform.translation.y = state.original_position.y + self.config.lift_height * eased;
                objects.write_transform(&id, Claim::Move, transform);
                if t >= 1.0 {
                    self.phase = MovePhase::Moving;
                    debug!("Building {} lifted", id);
                }
                None
            }
            MovePhase::Moving => {
                if current.translation.y != lifted_y {
                    let mut transform = current;
                    transform.translation.y = lifted_y;
                    objects.write_transform(&id, Claim::Move, transform);
                }
                None
            }
            MovePhase::Committing => {
                let target = state.target_position;
                let grid = state.target_cell;
                if self.step_towards(&id, current, target, dt, objects) {
                    let mut landed = state.original_transform;
                    landed.translation = target;
                    Some(self.finish(landed, grid, true, objects))
                } else {
                    None
                }
            }
            MovePhase::Cancelling => {
                let target = state.original_position;
                if self.step_towards(&id, current, target, dt, objects) {
                    let original = state.original_transform;
                    let grid = snap_to_grid(original.translation, self.cell_size);
                    Some(self.finish(original, grid, false, objects))
                } else {
                    None
                }
            }
        }
    }

    /// Ghost footprint for the preview, available while a landing target is being chosen
    pub fn ghost(&self) -> Option<GhostPreview> {
        if !matches!(self.phase, MovePhase::Lifting | MovePhase::Moving) {
            return None;
        }
        self.state.as_ref().map(|s| GhostPreview {
            center: s.target_position,
            footprint: s.footprint,
            valid: s.placement_valid,
        })
    }

    /// Drop the session where it stands. Used when the building left the registry;
    /// the transform is not touched.
    pub fn abort(&mut self, objects: &mut WorldObjects) -> Option<EntityId> {
        let id = self.state.as_ref().map(|s| s.building_id.clone());
        if let Some(id) = &id {
            objects.release_claim(id, Claim::Move);
        }
        self.reset();
        id
    }

    fn step_towards(&self, id: &str, current: Transform, target: Vec3, dt: f32, objects: &mut WorldObjects) -> bool {
        let next = move_towards(current.translation, target, self.config.move_speed * dt);
        let mut transform = current;
        transform.translation = next;
        objects.write_transform(id, Claim::Move, transform);
        next.distance(target) <= self.config.arrive_epsilon
    }

    fn finish(&mut self, transform: Transform, grid: IVec2, committed: bool, objects: &mut WorldObjects) -> MoveOutcome {
        let id = self.state.as_ref().map(|s| s.building_id.clone()).unwrap_or_default();
        objects.write_transform(&id, Claim::Move, transform);
        objects.release_claim(&id, Claim::Move);
        self.reset();
        if committed {
            info!("Building {} placed at cell {:?}", id, grid);
        } else {
            info!("Building {} returned to cell {:?}", id, grid);
        }
        MoveOutcome {
            building_id: id,
            grid,
            position: transform.translation,
            committed,
        }
    }

    fn reset(&mut self) {
        self.state = None;
        self.phase = MovePhase::Idle;
        self.lift_elapsed = 0.0;
    }
}
