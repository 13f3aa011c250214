use bevy::prelude::*;

/// Stable id assigned by the entity lifecycle (minion / building spawner)
pub type EntityId = String;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TargetKind {
    Minion,
    Building,
    Ground,
}

impl TargetKind {
    /// Pools are resolved in this order; the first pool with any hit wins
    pub const PRIORITY: [TargetKind; 3] = [TargetKind::Minion, TargetKind::Building, TargetKind::Ground];
}

/// Descriptive data carried alongside a registered entity.
/// Also usable as a component on interactable entities.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct EntityMetadata {
    pub name: Option<String>,
    pub state: Option<String>,
    pub building_type: Option<String>,
    pub personality: Option<String>,
}

impl EntityMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..default()
        }
    }
}

/// A resolved pick result. Produced fresh on every resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    pub id: Option<EntityId>,
    pub world_position: Vec3,
    pub surface_normal: Vec3,
    pub distance: f32,
    pub entity: Option<Entity>,
    pub metadata: EntityMetadata,
}

impl Target {
    pub fn ground(world_position: Vec3, surface_normal: Vec3, distance: f32, entity: Option<Entity>) -> Self {
        Self {
            kind: TargetKind::Ground,
            id: None,
            world_position,
            surface_normal,
            distance,
            entity,
            metadata: EntityMetadata::default(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Aiming,
    Grabbing,
    Drawing,
    Moving,
    Menu,
}

impl InteractionMode {
    /// Legal edges of the mode graph
    pub fn can_transition(self, to: InteractionMode) -> bool {
        use InteractionMode::*;
        matches!(
            (self, to),
            (Idle, Aiming)
                | (Aiming, Menu)
                | (Aiming, Idle)
                | (Menu, Grabbing)
                | (Menu, Drawing)
                | (Menu, Moving)
                | (Menu, Idle)
                | (Grabbing, Idle)
                | (Drawing, Idle)
                | (Moving, Idle)
        )
    }
}

/// Orchestrator state; only mutated through mode transitions
#[derive(Clone, Debug, Default)]
pub struct InteractionState {
    pub mode: InteractionMode,
    pub target: Option<Target>,
    pub hold_start_time: Option<f32>,
    pub grabbed_entity_id: Option<EntityId>,
}

// Marker component for minions managed by the interaction core
#[derive(Component)]
pub struct Minion;

// Marker component for placed buildings
#[derive(Component)]
pub struct Building;

// Marker component for the ground mesh
#[derive(Component)]
pub struct GroundSurface;

// Marker component for the camera the staff looks through
#[derive(Component)]
pub struct StaffCamera;

// Marker component for the beam attachment point at the staff tip
#[derive(Component)]
pub struct StaffTip;

/// Links an ECS entity to its id in the interaction registry
#[derive(Component, Clone, Debug)]
pub struct InteractionId(pub EntityId);
