use bevy::prelude::Color;

// Hold-vs-tap timing
pub const HOLD_THRESHOLD: f32 = 0.2;               // Seconds a press must last before the context menu opens
pub const QUICK_INFO_DURATION: f32 = 2.5;          // Seconds the tap info card stays visible

// Grab spring settings
pub const SPRING_STIFFNESS: f32 = 40.0;
pub const SPRING_DAMPING_RATIO: f32 = 1.0;         // 1.0 = critically damped
pub const SPRING_MASS: f32 = 1.0;
pub const SPRING_MAX_VELOCITY: f32 = 30.0;
pub const GRAB_DISTANCE: f32 = 6.0;                // First-person: how far in front of the camera the object floats
pub const GRAB_HOVER_HEIGHT: f32 = 3.0;            // Isometric: float height above the pointer's ground point

// Tumble / wobble
pub const TUMBLE_MAX_SPEED: f32 = 2.5;             // Radians per second per axis at grab time
pub const TUMBLE_DECAY: f32 = 0.995;               // Angular velocity multiplier per update
pub const WOBBLE_AMPLITUDE: f32 = 1.5;             // Radians per second of sinusoidal wobble
pub const WOBBLE_FREQ_MIN: f32 = 0.8;
pub const WOBBLE_FREQ_MAX: f32 = 2.4;

// Throw settings
pub const THROW_FORCE: f32 = 18.0;                 // Magnitude of the release velocity
pub const THROW_UPWARD_BIAS: f32 = 0.25;           // Added to camera forward.y before normalizing

// Foundation grid
pub const GRID_CELL_SIZE: f32 = 2.0;               // World units per foundation cell
pub const MIN_FOUNDATION_CELLS: usize = 4;
pub const CELL_MATERIALIZE_RADIUS: i32 = 6;        // Cells spawned around a touched cell (Chebyshev radius)
pub const CELL_VISUAL_OFFSET: f32 = 0.05;          // Lift cell quads above terrain to prevent z-fighting
pub const CELL_IDLE_COLOR: Color = Color::srgba(0.6, 0.6, 0.7, 0.15);
pub const CELL_HOVER_COLOR: Color = Color::srgba(0.5, 0.9, 1.0, 0.35);
pub const CELL_SELECTED_COLOR: Color = Color::srgba(1.0, 0.75, 0.2, 0.7);

// Building relocation
pub const MOVE_LIFT_HEIGHT: f32 = 3.0;
pub const MOVE_LIFT_DURATION: f32 = 0.4;           // Seconds to reach lift height
pub const MOVE_SPEED: f32 = 12.0;                  // World units per second while landing or returning
pub const MOVE_ARRIVE_EPSILON: f32 = 0.02;
pub const GHOST_VALID_COLOR: Color = Color::srgba(0.3, 1.0, 0.4, 0.35);
pub const GHOST_BLOCKED_COLOR: Color = Color::srgba(1.0, 0.25, 0.2, 0.35);

// Picking
pub const MINION_PICK_RADIUS_PX: f32 = 48.0;       // Screen-space pick radius for minions
pub const BUILDING_PICK_RADIUS_PX: f32 = 90.0;     // Buildings are bigger targets
pub const MAX_RAY_DISTANCE: f32 = 500.0;
pub const GROUND_MARCH_STEP: f32 = 0.5;            // Ray-march step against the height field
pub const DEFAULT_MINION_HALF_EXTENTS: bevy::prelude::Vec3 = bevy::prelude::Vec3::new(0.4, 0.8, 0.4);
pub const DEFAULT_BUILDING_HALF_EXTENTS: bevy::prelude::Vec3 = bevy::prelude::Vec3::new(2.0, 2.0, 2.0);

// Highlight
pub const HIGHLIGHT_EMISSIVE: bevy::prelude::LinearRgba = bevy::prelude::LinearRgba::new(0.6, 0.5, 0.1, 1.0);

// Context menu
pub const MENU_DEAD_ZONE: f32 = 24.0;              // Pixels of accumulated look delta before a slot is chosen

// Beam presentation
pub const BEAM_CAMERA_OFFSET: bevy::prelude::Vec3 = bevy::prelude::Vec3::new(0.35, -0.3, -0.6);
pub const BEAM_WIDTH: f32 = 0.06;
pub const BEAM_AIM_COLOR: Color = Color::srgb(0.4, 0.8, 1.0);
pub const BEAM_MENU_COLOR: Color = Color::srgb(0.9, 0.9, 1.0);
pub const BEAM_GRAB_COLOR: Color = Color::srgb(0.7, 0.3, 1.0);
pub const BEAM_DRAW_COLOR: Color = Color::srgb(1.0, 0.75, 0.2);
pub const BEAM_MOVE_COLOR: Color = Color::srgb(0.3, 1.0, 0.4);

// Suspension
pub const SUSPEND_TILT: f32 = 0.15;                // Radians a considered minion leans back

// Demo camera settings
pub const CAMERA_SPEED: f32 = 30.0;
pub const CAMERA_ZOOM_SPEED: f32 = 4.0;
pub const CAMERA_MIN_DISTANCE: f32 = 8.0;
pub const CAMERA_MAX_DISTANCE: f32 = 120.0;
pub const CAMERA_ROTATION_SPEED: f32 = 0.005;
pub const FIRST_PERSON_EYE_HEIGHT: f32 = 1.7;

// Demo terrain
pub const TERRAIN_GRID_SIZE: usize = 65;
pub const TERRAIN_SIZE: f32 = 160.0;
pub const TERRAIN_MAX_HEIGHT: f32 = 4.0;
