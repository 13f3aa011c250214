// Highlight tracking - exactly one entity carries the emissive tint at a time
use bevy::prelude::*;
use std::collections::HashSet;

use crate::constants::HIGHLIGHT_EMISSIVE;
use crate::types::*;

/// Which entity should currently be highlighted
#[derive(Default, Debug)]
pub struct HighlightTracker {
    current: Option<(EntityId, Entity)>,
}

impl HighlightTracker {
    /// Follow a resolution result. Returns true only when the highlighted entity changed,
    /// so reselecting the same target is a no-op.
    pub fn update(&mut self, target: Option<&Target>) -> bool {
        let next = target
            .filter(|t| t.kind != TargetKind::Ground)
            .and_then(|t| Some((t.id.clone()?, t.entity?)));

        // An id re-registered to a new entity counts as a change
        if next == self.current {
            return false;
        }
        self.current = next;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn current_entity(&self) -> Option<Entity> {
        self.current.as_ref().map(|(_, entity)| *entity)
    }
}

/// One mesh carrying the highlight tint
#[derive(Clone, Debug)]
pub struct TintedMesh {
    pub entity: Entity,
    pub original: Handle<StandardMaterial>,
    pub tinted: Handle<StandardMaterial>,
}

/// Applied highlight on a registered root; lists every tinted mesh below it
#[derive(Component)]
pub struct Highlighted {
    pub meshes: Vec<TintedMesh>,
}

/// Make the ECS match the tracker: tint the desired entity, un-tint every other one.
/// Meshes may sit on the root or anywhere in its hierarchy (glTF scenes put them on children).
pub fn sync_highlight(
    desired: Option<Entity>,
    commands: &mut Commands,
    materials: &mut Assets<StandardMaterial>,
    highlighted: &Query<Entity, With<Highlighted>>,
    children: &Query<&Children>,
    mesh_materials: &mut Query<&mut MeshMaterial3d<StandardMaterial>>,
    warned: &mut HashSet<Entity>,
) {
    for entity in highlighted.iter() {
        if Some(entity) != desired {
            commands.entity(entity).try_remove::<Highlighted>();
        }
    }

    let Some(root) = desired else { return };
    if highlighted.contains(root) {
        return;
    }

    let mut tinted_meshes = Vec::new();
    let mut pending = vec![root];
    while let Some(entity) = pending.pop() {
        if let Ok(kids) = children.get(entity) {
            pending.extend_from_slice(kids);
        }
        let Ok(mut material) = mesh_materials.get_mut(entity) else { continue };
        let Some(mut tint) = materials.get(&material.0).cloned() else { continue };
        tint.emissive = tint.emissive + HIGHLIGHT_EMISSIVE;
        let tinted = materials.add(tint);
        let original = std::mem::replace(&mut material.0, tinted.clone());
        tinted_meshes.push(TintedMesh { entity, original, tinted });
    }

    if tinted_meshes.is_empty() {
        if warned.insert(root) {
            warn!("Cannot highlight {:?}: no StandardMaterial in its hierarchy", root);
        }
        return;
    }
    commands.entity(root).try_insert(Highlighted { meshes: tinted_meshes });
}

/// Observer: whatever removes the highlight (deselect, despawn, cancellation) restores the materials
pub fn restore_highlight_material(
    trigger: Trigger<OnRemove, Highlighted>,
    highlighted: Query<&Highlighted>,
    mut mesh_materials: Query<&mut MeshMaterial3d<StandardMaterial>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    let Ok(highlight) = highlighted.get(trigger.target()) else {
        return;
    };
    for mesh in &highlight.meshes {
        // Meshes despawned along with the root have nothing left to restore
        if let Ok(mut material) = mesh_materials.get_mut(mesh.entity) {
            if material.0 == mesh.tinted {
                material.0 = mesh.original.clone();
            }
        }
        if let Some(materials) = materials.as_deref_mut() {
            materials.remove(&mesh.tinted);
        }
    }
}
