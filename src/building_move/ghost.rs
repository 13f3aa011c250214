// Ghost preview: candidate landing footprint and its overlap test
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;

use crate::constants::*;
use crate::interaction::StaffInteractionController;
use crate::registry::WorldObjects;
use crate::types::TargetKind;

/// Where the moved building would land
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostPreview {
    pub center: Vec3,
    pub footprint: Vec2,
    pub valid: bool,
}

/// Axis-aligned XZ rectangle of a footprint centered on `center`
pub fn footprint_rect(center: Vec3, footprint: Vec2) -> Rect {
    Rect::from_center_size(Vec2::new(center.x, center.z), footprint)
}

/// True when the footprint overlaps any other registered building.
/// Rectangles that only share an edge do not count.
pub fn placement_blocked(objects: &WorldObjects, moving_id: &str, center: Vec3, footprint: Vec2) -> bool {
    let candidate = footprint_rect(center, footprint);
    objects
        .iter_kind(TargetKind::Building)
        .filter(|other| other.id != moving_id)
        .any(|other| {
            let rect = footprint_rect(other.transform.translation, other.footprint());
            !candidate.intersect(rect).is_empty()
        })
}

#[derive(Component)]
pub struct MoveGhostVisual;

#[derive(Resource)]
pub struct GhostVisualAssets {
    pub mesh: Handle<Mesh>,
    pub valid: Handle<StandardMaterial>,
    pub blocked: Handle<StandardMaterial>,
}

fn ghost_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        emissive: color.to_linear() * 0.5,
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        cull_mode: None,
        double_sided: true,
        ..default()
    }
}

pub fn setup_ghost_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Unit slab, scaled to the footprint each frame
    commands.insert_resource(GhostVisualAssets {
        mesh: meshes.add(Cuboid::new(1.0, 0.2, 1.0)),
        valid: materials.add(ghost_material(GHOST_VALID_COLOR)),
        blocked: materials.add(ghost_material(GHOST_BLOCKED_COLOR)),
    });
}

/// System: Keep a single ghost slab in sync with the move controller
pub fn sync_move_ghost(
    mut commands: Commands,
    controller: Res<StaffInteractionController>,
    assets: Option<Res<GhostVisualAssets>>,
    mut ghosts: Query<(Entity, &mut Transform, &mut MeshMaterial3d<StandardMaterial>), With<MoveGhostVisual>>,
) {
    let Some(assets) = assets else { return };

    let Some(preview) = controller.mover().ghost() else {
        for (entity, _, _) in ghosts.iter() {
            commands.entity(entity).try_despawn();
        }
        return;
    };

    let material = if preview.valid { &assets.valid } else { &assets.blocked };
    let transform = Transform::from_translation(preview.center + Vec3::Y * 0.1)
        .with_scale(Vec3::new(preview.footprint.x, 1.0, preview.footprint.y));

    if let Some((_, mut current, mut current_material)) = ghosts.iter_mut().next() {
        *current = transform;
        if current_material.0 != *material {
            current_material.0 = material.clone();
        }
        return;
    }

    commands.spawn((
        Mesh3d(assets.mesh.clone()),
        MeshMaterial3d(material.clone()),
        transform,
        MoveGhostVisual,
        NotShadowCaster,
        NotShadowReceiver,
    ));
}
