// Context menus - fixed action lists per target kind, radial look selection
use bevy::prelude::*;
use std::f32::consts::TAU;

use crate::types::TargetKind;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MenuAction {
    Grab,
    Chat,
    Quest,
    Details,
    Move,
    Workers,
    Aesthetic,
    Status,
    Build,
    SpawnMinion,
}

const MINION_ACTIONS: [MenuAction; 4] = [MenuAction::Grab, MenuAction::Chat, MenuAction::Quest, MenuAction::Details];
const BUILDING_ACTIONS: [MenuAction; 4] = [MenuAction::Move, MenuAction::Workers, MenuAction::Aesthetic, MenuAction::Status];
const GROUND_ACTIONS: [MenuAction; 3] = [MenuAction::Build, MenuAction::SpawnMinion, MenuAction::Details];

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Grab => "Grab",
            MenuAction::Chat => "Chat",
            MenuAction::Quest => "Quest",
            MenuAction::Details => "Details",
            MenuAction::Move => "Move",
            MenuAction::Workers => "Workers",
            MenuAction::Aesthetic => "Aesthetic",
            MenuAction::Status => "Status",
            MenuAction::Build => "Build",
            MenuAction::SpawnMinion => "Spawn Minion",
        }
    }
}

pub fn actions_for(kind: TargetKind) -> &'static [MenuAction] {
    match kind {
        TargetKind::Minion => &MINION_ACTIONS,
        TargetKind::Building => &BUILDING_ACTIONS,
        TargetKind::Ground => &GROUND_ACTIONS,
    }
}

/// Radial slot for a screen-space direction. Slot 0 is straight up, slots run clockwise.
pub fn slot_for_direction(direction: Vec2, slots: usize) -> Option<usize> {
    if slots == 0 || direction.length_squared() == 0.0 {
        return None;
    }
    // Screen y grows downward
    let angle = direction.x.atan2(-direction.y).rem_euclid(TAU);
    let span = TAU / slots as f32;
    Some(((angle / span).round() as usize) % slots)
}

/// An open context menu
#[derive(Clone, Debug)]
pub struct ContextMenu {
    kind: TargetKind,
    look: Vec2,
    highlighted: Option<usize>,
    dead_zone: f32,
    /// Still held from the press that opened it; releasing over a slot confirms
    pub held: bool,
}

impl ContextMenu {
    pub fn open(kind: TargetKind, dead_zone: f32, held: bool) -> Self {
        Self {
            kind,
            look: Vec2::ZERO,
            highlighted: None,
            dead_zone,
            held,
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn actions(&self) -> &'static [MenuAction] {
        actions_for(self.kind)
    }

    pub fn contains(&self, action: MenuAction) -> bool {
        self.actions().contains(&action)
    }

    pub fn highlighted(&self) -> Option<MenuAction> {
        self.highlighted.and_then(|i| self.actions().get(i).copied())
    }

    pub fn highlighted_slot(&self) -> Option<usize> {
        self.highlighted
    }

    /// Accumulate raw pointer motion. Inside the dead zone nothing is highlighted.
    pub fn accumulate_look(&mut self, delta: Vec2) -> Option<MenuAction> {
        // Cap the accumulator so reversing direction responds quickly
        self.look = (self.look + delta).clamp_length_max(self.dead_zone * 2.0);
        self.highlighted = if self.look.length() < self.dead_zone {
            None
        } else {
            slot_for_direction(self.look, self.actions().len())
        };
        self.highlighted()
    }
}
