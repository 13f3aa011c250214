// Force grab - spring-damper pull toward a moving target with chaotic tumble
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::config::SpringConfig;
use crate::constants::*;
use crate::registry::{Claim, WorldObjects};
use crate::types::EntityId;

/// Hand-off data for an external ballistics step
#[derive(Clone, Debug, PartialEq)]
pub struct ThrowResult {
    pub id: EntityId,
    pub velocity: Vec3,
    pub origin_position: Vec3,
}

struct GrabSession {
    id: EntityId,
    original: Transform,      // Restored verbatim on cancel
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    target: Vec3,
    angular_velocity: Vec3,   // Tumble, decays toward rest
    wobble_phase: Vec3,
    wobble_freq: Vec3,
    elapsed: f32,
}

pub struct ForceGrabController {
    spring: SpringConfig,
    throw_force: f32,
    throw_upward_bias: f32,
    session: Option<GrabSession>,
    rng: StdRng,
}

impl ForceGrabController {
    pub fn new(spring: SpringConfig, throw_force: f32, throw_upward_bias: f32) -> Self {
        Self {
            spring,
            throw_force,
            throw_upward_bias,
            session: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic tumble for tests and replays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn grabbed_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    pub fn position(&self) -> Option<Vec3> {
        self.session.as_ref().map(|s| s.position)
    }

    pub fn velocity(&self) -> Option<Vec3> {
        self.session.as_ref().map(|s| s.velocity)
    }

    /// Claim an entity and start floating it. Fails if something is already grabbed,
    /// the id is unknown, or another controller holds the entity.
    pub fn grab(&mut self, id: &str, objects: &mut WorldObjects) -> bool {
        if self.session.is_some() {
            debug!("Grab ignored: already holding {:?}", self.grabbed_id());
            return false;
        }
        let Some(entity) = objects.get(id) else {
            return false;
        };
        let original = entity.transform;
        if !objects.try_claim(id, Claim::Grab) {
            return false;
        }

        let max_spin = TUMBLE_MAX_SPEED;
        let angular_velocity = Vec3::new(
            self.rng.gen_range(-max_spin..=max_spin),
            self.rng.gen_range(-max_spin..=max_spin),
            self.rng.gen_range(-max_spin..=max_spin),
        );
        let wobble_phase = Vec3::new(
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
        );
        let wobble_freq = Vec3::new(
            self.rng.gen_range(WOBBLE_FREQ_MIN..=WOBBLE_FREQ_MAX),
            self.rng.gen_range(WOBBLE_FREQ_MIN..=WOBBLE_FREQ_MAX),
            self.rng.gen_range(WOBBLE_FREQ_MIN..=WOBBLE_FREQ_MAX),
        );

        info!("Grabbed {} at {:?}", id, original.translation);
        self.session = Some(GrabSession {
            id: id.to_string(),
            original,
            position: original.translation,
            rotation: original.rotation,
            velocity: Vec3::ZERO,
            target: original.translation,
            angular_velocity,
            wobble_phase,
            wobble_freq,
            elapsed: 0.0,
        });
        true
    }

    pub fn update_target(&mut self, point: Vec3) {
        if let Some(session) = self.session.as_mut() {
            session.target = point;
        }
    }

    /// Integrate one step: spring + damping, semi-implicit Euler, then tumble and wobble
    pub fn update(&mut self, dt: f32, objects: &mut WorldObjects) {
        let Some(session) = self.session.as_mut() else { return };
        if dt <= 0.0 {
            return;
        }

        let spring = &self.spring;
        let spring_force = (session.target - session.position) * spring.stiffness;
        let damping_force = -session.velocity * spring.critical_damping() * spring.damping;
        let acceleration = (spring_force + damping_force) / spring.mass;

        session.velocity += acceleration * dt;
        session.velocity = session.velocity.clamp_length_max(spring.max_velocity);
        session.position += session.velocity * dt;

        session.elapsed += dt;
        let spin = Quat::from_scaled_axis(session.angular_velocity * dt);
        let wobble_x = (session.elapsed * session.wobble_freq.x + session.wobble_phase.x).sin() * WOBBLE_AMPLITUDE * dt;
        let wobble_z = (session.elapsed * session.wobble_freq.z + session.wobble_phase.z).sin() * WOBBLE_AMPLITUDE * dt;
        session.rotation = (spin * session.rotation * Quat::from_rotation_x(wobble_x) * Quat::from_rotation_z(wobble_z)).normalize();
        session.angular_velocity *= TUMBLE_DECAY;

        let transform = Transform {
            translation: session.position,
            rotation: session.rotation,
            scale: session.original.scale,
        };
        objects.write_transform(&session.id, Claim::Grab, transform);
    }

    /// Let go in place. Returns the override velocity if given, otherwise the current one.
    pub fn release(&mut self, velocity: Option<Vec3>, objects: &mut WorldObjects) -> Option<Vec3> {
        let session = self.session.take()?;
        objects.release_claim(&session.id, Claim::Grab);
        let velocity = velocity.unwrap_or(session.velocity);
        info!("Released {} with velocity {:?}", session.id, velocity);
        Some(velocity)
    }

    /// Launch along the camera forward, biased upward, at the configured force
    pub fn throw(&mut self, camera_forward: Vec3, objects: &mut WorldObjects) -> Option<ThrowResult> {
        let session = self.session.take()?;
        objects.release_claim(&session.id, Claim::Grab);

        let direction = (camera_forward.normalize_or_zero() + Vec3::Y * self.throw_upward_bias).normalize_or(Vec3::Y);
        let velocity = direction * self.throw_force;
        info!("Threw {} with velocity {:?}", session.id, velocity);
        Some(ThrowResult {
            id: session.id,
            velocity,
            origin_position: session.position,
        })
    }

    /// Put the entity back exactly where it was grabbed
    pub fn cancel(&mut self, objects: &mut WorldObjects) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        objects.write_transform(&session.id, Claim::Grab, session.original);
        objects.release_claim(&session.id, Claim::Grab);
        info!("Grab of {} cancelled", session.id);
        true
    }

    /// Drop the session without touching the entity (it left the registry)
    pub fn abandon(&mut self) -> Option<EntityId> {
        self.session.take().map(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityMetadata;

    const DT: f32 = 1.0 / 60.0;

    fn scene_with_minion(at: Vec3) -> WorldObjects {
        let mut objects = WorldObjects::default();
        objects
            .register_minion("e", Entity::from_raw(7), EntityMetadata::named("E"))
            .place(Transform::from_translation(at));
        objects
    }

    fn controller(damping: f32) -> ForceGrabController {
        let spring = SpringConfig { damping, ..SpringConfig::default() };
        ForceGrabController::new(spring, THROW_FORCE, THROW_UPWARD_BIAS).with_seed(11)
    }

    #[test]
    fn test_operations_without_grab_are_noops() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        let mut grab = controller(1.0);
        grab.update_target(Vec3::ONE);
        grab.update(DT, &mut objects);
        assert_eq!(grab.release(None, &mut objects), None);
        assert_eq!(grab.throw(Vec3::NEG_Z, &mut objects), None);
        assert!(!grab.cancel(&mut objects));
        assert!(objects.take_dirty().is_empty());
    }

    #[test]
    fn test_critically_damped_spring_converges_without_overshoot() {
        for ratio in [1.0, 1.2, 2.0] {
            let mut objects = scene_with_minion(Vec3::ZERO);
            let mut grab = controller(ratio);
            assert!(grab.grab("e", &mut objects));
            grab.update_target(Vec3::new(5.0, 0.0, 0.0));

            let mut max_x = f32::MIN;
            for _ in 0..900 {
                grab.update(DT, &mut objects);
                max_x = max_x.max(grab.position().unwrap().x);
            }
            let position = grab.position().unwrap();
            assert!((position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-2, "ratio {ratio} ended at {position:?}");
            assert!(max_x <= 5.0 + 1e-3, "ratio {ratio} overshot to {max_x}");
        }
    }

    #[test]
    fn test_underdamped_spring_overshoots() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        let mut grab = controller(0.2);
        grab.grab("e", &mut objects);
        grab.update_target(Vec3::new(5.0, 0.0, 0.0));

        let mut max_x = f32::MIN;
        for _ in 0..900 {
            grab.update(DT, &mut objects);
            max_x = max_x.max(grab.position().unwrap().x);
        }
        assert!(max_x > 5.1, "expected overshoot, peak was {max_x}");
    }

    #[test]
    fn test_velocity_is_clamped() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        let mut grab = controller(0.1);
        grab.grab("e", &mut objects);
        grab.update_target(Vec3::new(1000.0, 0.0, 0.0));
        for _ in 0..60 {
            grab.update(DT, &mut objects);
            assert!(grab.velocity().unwrap().length() <= SPRING_MAX_VELOCITY + 1e-3);
        }
    }

    #[test]
    fn test_throw_follows_camera_forward_with_upward_arc() {
        let mut objects = scene_with_minion(Vec3::new(0.0, 1.0, 0.0));
        let mut grab = controller(1.0);
        grab.grab("e", &mut objects);
        grab.update_target(Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..10 {
            grab.update(DT, &mut objects);
        }
        let last_position = grab.position().unwrap();

        let thrown = grab.throw(Vec3::new(0.0, 0.0, -1.0), &mut objects).unwrap();
        assert_eq!(thrown.id, "e");
        assert_eq!(thrown.origin_position, last_position);
        assert!(thrown.velocity.z < 0.0);
        assert!(thrown.velocity.y > 0.0);
        assert!(thrown.velocity.z.abs() > thrown.velocity.y * 2.0);
        assert!((thrown.velocity.length() - THROW_FORCE).abs() < 1e-3);

        assert!(!grab.is_active());
        assert_eq!(objects.get("e").unwrap().claim(), None);
    }

    #[test]
    fn test_cancel_restores_original_transform_exactly() {
        let mut objects = scene_with_minion(Vec3::new(1.0, 2.0, 3.0));
        let mut grab = controller(1.0);
        grab.grab("e", &mut objects);
        grab.update_target(Vec3::new(-4.0, 6.0, 2.0));
        for _ in 0..30 {
            grab.update(DT, &mut objects);
        }
        let moved = objects.get("e").unwrap().transform;
        assert_ne!(moved.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_ne!(moved.rotation, Quat::IDENTITY);

        assert!(grab.cancel(&mut objects));
        let restored = objects.get("e").unwrap();
        assert_eq!(restored.transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(restored.transform.rotation, Quat::IDENTITY);
        assert_eq!(restored.claim(), None);
    }

    #[test]
    fn test_release_keeps_current_transform() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        let mut grab = controller(1.0);
        grab.grab("e", &mut objects);
        grab.update_target(Vec3::new(0.0, 4.0, 0.0));
        for _ in 0..20 {
            grab.update(DT, &mut objects);
        }
        let held = objects.get("e").unwrap().transform;
        let current_velocity = grab.velocity().unwrap();

        assert_eq!(grab.release(None, &mut objects), Some(current_velocity));
        assert_eq!(objects.get("e").unwrap().transform, held);

        grab.grab("e", &mut objects);
        assert_eq!(grab.release(Some(Vec3::X), &mut objects), Some(Vec3::X));
    }

    #[test]
    fn test_tumble_decays_over_time() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        let mut grab = controller(1.0);
        grab.grab("e", &mut objects);
        let initial = grab.session.as_ref().unwrap().angular_velocity.length();
        for _ in 0..600 {
            grab.update(DT, &mut objects);
        }
        let later = grab.session.as_ref().unwrap().angular_velocity.length();
        assert!(later < initial * 0.1);
    }

    #[test]
    fn test_second_grab_is_rejected() {
        let mut objects = scene_with_minion(Vec3::ZERO);
        objects.register_minion("f", Entity::from_raw(8), EntityMetadata::default());
        let mut grab = controller(1.0);
        assert!(grab.grab("e", &mut objects));
        assert!(!grab.grab("f", &mut objects));
        assert_eq!(grab.grabbed_id(), Some("e"));
        assert!(!grab.grab("missing", &mut objects));
    }
}
