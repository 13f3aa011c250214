// Demo camera - RTS orbit in isometric view, walking eye in first person
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use crate::config::ViewSettings;
use crate::constants::*;
use crate::terrain::{HeightSampler, TerrainHeightmap};

#[derive(Component, Clone, Debug)]
pub struct StaffCameraRig {
    pub focus_point: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for StaffCameraRig {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            yaw: 0.0,
            pitch: -0.9,
            distance: 40.0,
        }
    }
}

impl StaffCameraRig {
    /// Camera pose for the current view mode
    pub fn pose(&self, isometric: bool, ground_height: f32) -> Transform {
        if isometric {
            let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
            let offset = rotation * Vec3::new(0.0, 0.0, self.distance);
            Transform {
                translation: self.focus_point + offset,
                rotation,
                ..default()
            }
        } else {
            let eye = Vec3::new(self.focus_point.x, ground_height + FIRST_PERSON_EYE_HEIGHT, self.focus_point.z);
            Transform {
                translation: eye,
                rotation: Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0),
                ..default()
            }
        }
    }
}

/// System: Tab swaps between isometric and first-person
pub fn toggle_view_mode(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut view: ResMut<ViewSettings>,
    mut rigs: Query<&mut StaffCameraRig>,
) {
    if !keyboard_input.just_pressed(KeyCode::Tab) {
        return;
    }
    // The plugin forwards the change to the targeting strategy
    view.isometric = !view.isometric;
    for mut rig in rigs.iter_mut() {
        // Level the view when walking, tilt it back down for the overview
        rig.pitch = if view.isometric { -0.9 } else { -0.15 };
    }
    info!("View: {}", if view.isometric { "isometric" } else { "first person" });
}

pub fn staff_camera_movement(
    time: Res<Time>,
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mouse_button_input: Res<ButtonInput<MouseButton>>,
    view: Res<ViewSettings>,
    heightmap: Option<Res<TerrainHeightmap>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut mouse_motion_events: EventReader<MouseMotion>,
    mut camera_query: Query<(&mut Transform, &mut StaffCameraRig)>,
) {
    let Ok((mut transform, mut rig)) = camera_query.single_mut() else { return };
    let delta_time = time.delta_secs();

    // Middle mouse drag rotates; left and right buttons belong to the staff
    if mouse_button_input.pressed(MouseButton::Middle) {
        let pitch_range = if view.isometric { -1.5..=-0.1 } else { -1.4..=1.4 };
        for motion in mouse_motion_events.read() {
            rig.yaw -= motion.delta.x * CAMERA_ROTATION_SPEED;
            rig.pitch = (rig.pitch - motion.delta.y * CAMERA_ROTATION_SPEED)
                .clamp(*pitch_range.start(), *pitch_range.end());
        }
    } else {
        mouse_motion_events.clear();
    }

    let mut movement = Vec3::ZERO;
    if keyboard_input.pressed(KeyCode::KeyW) || keyboard_input.pressed(KeyCode::ArrowUp) {
        movement.z -= 1.0;
    }
    if keyboard_input.pressed(KeyCode::KeyS) || keyboard_input.pressed(KeyCode::ArrowDown) {
        movement.z += 1.0;
    }
    if keyboard_input.pressed(KeyCode::KeyA) || keyboard_input.pressed(KeyCode::ArrowLeft) {
        movement.x -= 1.0;
    }
    if keyboard_input.pressed(KeyCode::KeyD) || keyboard_input.pressed(KeyCode::ArrowRight) {
        movement.x += 1.0;
    }
    if movement.length() > 0.0 {
        let speed = if view.isometric { CAMERA_SPEED } else { CAMERA_SPEED * 0.3 };
        movement = movement.normalize() * speed * delta_time;
        // Yaw only, so movement stays on the ground plane
        let yaw = rig.yaw;
        rig.focus_point += Mat3::from_rotation_y(yaw) * movement;
    }

    if view.isometric {
        for scroll in scroll_events.read() {
            let zoom_delta = match scroll.unit {
                MouseScrollUnit::Line => scroll.y * CAMERA_ZOOM_SPEED,
                MouseScrollUnit::Pixel => scroll.y * CAMERA_ZOOM_SPEED * 0.1,
            };
            rig.distance = (rig.distance - zoom_delta).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
        }
    } else {
        scroll_events.clear();
    }

    let ground = heightmap
        .as_ref()
        .map(|hm| hm.height_at(rig.focus_point.x, rig.focus_point.z))
        .unwrap_or(0.0);
    *transform = rig.pose(view.isometric, ground);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isometric_pose_orbits_focus() {
        let rig = StaffCameraRig {
            focus_point: Vec3::new(5.0, 0.0, 5.0),
            yaw: 0.0,
            pitch: -std::f32::consts::FRAC_PI_2,
            distance: 20.0,
        };
        let pose = rig.pose(true, 0.0);
        assert!((pose.translation - Vec3::new(5.0, 20.0, 5.0)).length() < 1e-4);
        assert!(pose.forward().dot(Vec3::NEG_Y) > 0.999);
    }

    #[test]
    fn test_first_person_pose_stands_on_ground() {
        let rig = StaffCameraRig {
            focus_point: Vec3::new(1.0, 0.0, 2.0),
            pitch: 0.0,
            ..default()
        };
        let pose = rig.pose(false, 3.0);
        assert_eq!(pose.translation, Vec3::new(1.0, 3.0 + FIRST_PERSON_EYE_HEIGHT, 2.0));
        assert!(pose.forward().dot(Vec3::NEG_Z) > 0.999);
    }
}
