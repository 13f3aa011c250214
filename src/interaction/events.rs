// Outbound messages. The orchestrator queues `InteractionEvent`s; the plugin
// drains the queue into the typed Bevy events below.
use bevy::prelude::*;

use crate::building_move::MoveOutcome;
use crate::foundation::DrawnFoundation;
use crate::grab::ThrowResult;
use crate::types::{EntityId, InteractionMode, Target, TargetKind};

use super::menu::MenuAction;

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    ModeChanged(InteractionMode),
    MenuActionSelected {
        action: MenuAction,
        target_kind: TargetKind,
        target_id: Option<EntityId>,
    },
    FoundationCompleted(DrawnFoundation),
    BuildingMoveFinished(MoveOutcome),
    EntityThrown(ThrowResult),
    EntityReleased { id: EntityId, velocity: Vec3 },
    SpawnRequested { position: Vec3 },
    QuickInfoShown(Target),
    QuickInfoHidden,
}

#[derive(Event, Clone, Debug)]
pub struct ModeChanged {
    pub mode: InteractionMode,
}

#[derive(Event, Clone, Debug)]
pub struct MenuActionSelected {
    pub action: MenuAction,
    pub target_kind: TargetKind,
    pub target_id: Option<EntityId>,
}

#[derive(Event, Clone, Debug)]
pub struct FoundationCompleted {
    pub foundation: DrawnFoundation,
}

/// `grid` is the landing cell on commit, the restored cell on cancel
#[derive(Event, Clone, Debug)]
pub struct BuildingMoveFinished {
    pub building_id: EntityId,
    pub grid: IVec2,
    pub position: Vec3,
    pub committed: bool,
}

/// Post-release flight belongs to whoever listens for this
#[derive(Event, Clone, Debug)]
pub struct EntityThrown {
    pub id: EntityId,
    pub velocity: Vec3,
    pub origin: Vec3,
}

#[derive(Event, Clone, Debug)]
pub struct EntityReleased {
    pub id: EntityId,
    pub velocity: Vec3,
}

#[derive(Event, Clone, Debug)]
pub struct SpawnRequested {
    pub position: Vec3,
}

#[derive(Event, Clone, Debug)]
pub struct QuickInfoShown {
    pub target: Target,
}

#[derive(Event, Clone, Debug)]
pub struct QuickInfoHidden;

pub(crate) fn add_interaction_events(app: &mut App) {
    app.add_event::<ModeChanged>()
        .add_event::<MenuActionSelected>()
        .add_event::<FoundationCompleted>()
        .add_event::<BuildingMoveFinished>()
        .add_event::<EntityThrown>()
        .add_event::<EntityReleased>()
        .add_event::<SpawnRequested>()
        .add_event::<QuickInfoShown>()
        .add_event::<QuickInfoHidden>();
}
