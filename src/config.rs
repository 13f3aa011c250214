// Interaction tuning resource
// All defaults come from constants.rs; apps may insert their own before adding the plugin.
use bevy::prelude::*;
use crate::constants::*;

/// Spring-damper parameters for the grab simulation.
///
/// `damping` is a ratio against the critical coefficient `2 * sqrt(stiffness * mass)`,
/// so any value >= 1.0 settles without oscillating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
    pub max_velocity: f32,
}

impl SpringConfig {
    /// Damping coefficient at which the spring is exactly critically damped
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: SPRING_STIFFNESS,
            damping: SPRING_DAMPING_RATIO,
            mass: SPRING_MASS,
            max_velocity: SPRING_MAX_VELOCITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    pub cell_size: f32,
    pub min_cells: usize,
    pub materialize_radius: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: GRID_CELL_SIZE,
            min_cells: MIN_FOUNDATION_CELLS,
            materialize_radius: CELL_MATERIALIZE_RADIUS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveConfig {
    pub lift_height: f32,
    pub lift_duration: f32,
    pub move_speed: f32,
    pub arrive_epsilon: f32,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            lift_height: MOVE_LIFT_HEIGHT,
            lift_duration: MOVE_LIFT_DURATION,
            move_speed: MOVE_SPEED,
            arrive_epsilon: MOVE_ARRIVE_EPSILON,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickConfig {
    pub minion_pixel_radius: f32,
    pub building_pixel_radius: f32,
    pub max_ray_distance: f32,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            minion_pixel_radius: MINION_PICK_RADIUS_PX,
            building_pixel_radius: BUILDING_PICK_RADIUS_PX,
            max_ray_distance: MAX_RAY_DISTANCE,
        }
    }
}

/// Interaction configuration resource
#[derive(Resource, Clone, Debug)]
pub struct InteractionConfig {
    pub hold_threshold: f32,
    pub quick_info_duration: f32,
    pub spring: SpringConfig,
    pub throw_force: f32,
    pub throw_upward_bias: f32,
    pub grab_distance: f32,
    pub grab_hover_height: f32,
    pub grid: GridConfig,
    pub movement: MoveConfig,
    pub picking: PickConfig,
    pub menu_dead_zone: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hold_threshold: HOLD_THRESHOLD,
            quick_info_duration: QUICK_INFO_DURATION,
            spring: SpringConfig::default(),
            throw_force: THROW_FORCE,
            throw_upward_bias: THROW_UPWARD_BIAS,
            grab_distance: GRAB_DISTANCE,
            grab_hover_height: GRAB_HOVER_HEIGHT,
            grid: GridConfig::default(),
            movement: MoveConfig::default(),
            picking: PickConfig::default(),
            menu_dead_zone: MENU_DEAD_ZONE,
        }
    }
}

/// Which targeting strategy the orchestrator should use
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSettings {
    pub isometric: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self { isometric: true }
    }
}
