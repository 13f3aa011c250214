// Cell quads for the drawing session
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;

use crate::constants::*;
use crate::interaction::StaffInteractionController;

use super::CellTint;

/// Tag for spawned cell quads
#[derive(Component)]
pub struct FoundationCellVisual {
    pub coord: IVec2,
}

/// Shared mesh and per-tint materials, built once at startup
#[derive(Resource)]
pub struct FoundationVisualAssets {
    pub mesh: Handle<Mesh>,
    pub idle: Handle<StandardMaterial>,
    pub hover: Handle<StandardMaterial>,
    pub selected: Handle<StandardMaterial>,
}

impl FoundationVisualAssets {
    pub fn material(&self, tint: CellTint) -> &Handle<StandardMaterial> {
        match tint {
            CellTint::Idle => &self.idle,
            CellTint::Hover => &self.hover,
            CellTint::Selected => &self.selected,
        }
    }
}

fn cell_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        emissive: color.to_linear() * 0.4,
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        cull_mode: None,
        double_sided: true,
        ..default()
    }
}

pub fn setup_foundation_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    controller: Res<StaffInteractionController>,
) {
    // Slight inset so neighbouring quads read as separate cells
    let half = controller.drawer().cell_size() * 0.46;
    commands.insert_resource(FoundationVisualAssets {
        mesh: meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(half))),
        idle: materials.add(cell_material(CELL_IDLE_COLOR)),
        hover: materials.add(cell_material(CELL_HOVER_COLOR)),
        selected: materials.add(cell_material(CELL_SELECTED_COLOR)),
    });
}

/// System: Spawn quads for new cells, retint existing ones, despawn discarded ones
pub fn sync_foundation_cells(
    mut commands: Commands,
    mut controller: ResMut<StaffInteractionController>,
    assets: Option<Res<FoundationVisualAssets>>,
    mut visuals: Query<(&FoundationCellVisual, &mut MeshMaterial3d<StandardMaterial>)>,
) {
    let Some(assets) = assets else { return };
    if !controller.drawer().is_active() && !controller.drawer().has_retired_visuals() {
        return;
    }

    if controller.drawer().has_retired_visuals() {
        for entity in controller.drawer_mut().take_retired_visuals() {
            commands.entity(entity).try_despawn();
        }
    }

    let drawer = controller.drawer();
    let mut spawned = Vec::new();
    for cell in drawer.cells() {
        let material = assets.material(drawer.tint(cell.coord));
        match cell.visual {
            Some(entity) => {
                if let Ok((_, mut current)) = visuals.get_mut(entity) {
                    if current.0 != *material {
                        current.0 = material.clone();
                    }
                }
            }
            None => {
                let entity = commands
                    .spawn((
                        Mesh3d(assets.mesh.clone()),
                        MeshMaterial3d(material.clone()),
                        Transform::from_translation(cell.world_position + Vec3::Y * CELL_VISUAL_OFFSET),
                        FoundationCellVisual { coord: cell.coord },
                        NotShadowCaster,
                        NotShadowReceiver,
                    ))
                    .id();
                spawned.push((cell.coord, entity));
            }
        }
    }

    // Mutable access marks the controller changed
    if !spawned.is_empty() {
        let drawer = controller.drawer_mut();
        for (coord, entity) in spawned {
            drawer.attach_visual(coord, entity);
        }
    }
}
