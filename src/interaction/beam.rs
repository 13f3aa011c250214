// Staff beam - presentation state driven purely by the interaction mode
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;

use crate::constants::*;
use crate::types::{InteractionMode, StaffCamera, StaffTip};

use super::StaffInteractionController;

/// Where the beam runs this frame and how it looks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamState {
    pub visible: bool,
    pub start: Vec3,
    pub end: Vec3,
    pub color: Color,
    pub intensity: f32,
}

impl Default for BeamState {
    fn default() -> Self {
        Self {
            visible: false,
            start: Vec3::ZERO,
            end: Vec3::ZERO,
            color: BEAM_AIM_COLOR,
            intensity: 0.0,
        }
    }
}

/// Color and emissive strength per mode; idle shows no beam
pub fn beam_style(mode: InteractionMode) -> Option<(Color, f32)> {
    match mode {
        InteractionMode::Idle => None,
        InteractionMode::Aiming => Some((BEAM_AIM_COLOR, 1.0)),
        InteractionMode::Menu => Some((BEAM_MENU_COLOR, 0.6)),
        InteractionMode::Grabbing => Some((BEAM_GRAB_COLOR, 2.5)),
        InteractionMode::Drawing => Some((BEAM_DRAW_COLOR, 1.2)),
        InteractionMode::Moving => Some((BEAM_MOVE_COLOR, 1.5)),
    }
}

/// Beam start when no staff tip exists: a fixed offset in camera space
pub fn fallback_origin(camera_position: Vec3, camera_forward: Vec3) -> Vec3 {
    let forward = camera_forward.normalize_or(Vec3::NEG_Z);
    // looking_to needs an up vector that is not parallel to forward
    let up = if forward.dot(Vec3::Y).abs() > 0.99 { Vec3::NEG_Z } else { Vec3::Y };
    Transform::from_translation(camera_position)
        .looking_to(forward, up)
        .transform_point(BEAM_CAMERA_OFFSET)
}

impl BeamState {
    pub fn update(&mut self, mode: InteractionMode, start: Vec3, end: Option<Vec3>) {
        match (beam_style(mode), end) {
            (Some((color, intensity)), Some(end)) => {
                self.visible = true;
                self.start = start;
                self.end = end;
                self.color = color;
                self.intensity = intensity;
            }
            _ => self.visible = false,
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

// ============================================================================
// ECS PRESENTATION
// ============================================================================

#[derive(Component)]
pub struct StaffBeam;

/// Staff tip position for the beam origin; `None` means use the camera offset
pub fn staff_tip_origin(
    tips: &Query<&GlobalTransform, (With<StaffTip>, Without<StaffCamera>)>,
    warned: &mut bool,
) -> Option<Vec3> {
    match tips.iter().next() {
        Some(tip) => Some(tip.translation()),
        None => {
            if !*warned {
                warn!("No StaffTip entity found, beam starts at a camera offset");
                *warned = true;
            }
            None
        }
    }
}

pub fn spawn_beam(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Unit length along +Z, stretched every frame
    let mesh = meshes.add(Cuboid::new(BEAM_WIDTH, BEAM_WIDTH, 1.0));
    let material = materials.add(StandardMaterial {
        base_color: BEAM_AIM_COLOR,
        emissive: BEAM_AIM_COLOR.to_linear(),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    commands.spawn((
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform::default(),
        Visibility::Hidden,
        StaffBeam,
        NotShadowCaster,
        NotShadowReceiver,
    ));
}

/// System: Stretch the beam mesh between start and end, tinted by mode
pub fn sync_beam_visual(
    controller: Res<StaffInteractionController>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut beams: Query<(&mut Transform, &mut Visibility, &MeshMaterial3d<StandardMaterial>), With<StaffBeam>>,
) {
    let beam = controller.beam();
    for (mut transform, mut visibility, material) in beams.iter_mut() {
        let length = beam.length();
        if !beam.visible || length < 0.01 {
            *visibility = Visibility::Hidden;
            continue;
        }
        *visibility = Visibility::Visible;
        let midpoint = (beam.start + beam.end) * 0.5;
        let direction = (beam.end - beam.start) / length;
        let up = if direction.dot(Vec3::Y).abs() > 0.99 { Vec3::X } else { Vec3::Y };
        *transform = Transform::from_translation(midpoint)
            .looking_to(direction, up)
            .with_scale(Vec3::new(1.0, 1.0, length));

        if let Some(mat) = materials.get_mut(&material.0) {
            if mat.base_color != beam.color {
                mat.base_color = beam.color;
                mat.emissive = beam.color.to_linear() * beam.intensity;
            }
        }
    }
}
