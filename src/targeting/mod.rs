// Targeting module - resolves the single best entity under a ray or pointer
//
// Submodules:
// - strategy: ray-cast and screen-space pick strategies
// - highlight: single-entity highlight tracking and its ECS application

mod strategy;
pub mod highlight;

use bevy::prelude::*;

use crate::config::PickConfig;
use crate::constants::GROUND_MARCH_STEP;
use crate::math_utils::ray_height_field_intersection;
use crate::registry::{Claim, RegisteredEntity, WorldObjects};
use crate::types::*;

pub use highlight::HighlightTracker;
pub use strategy::{PickStrategy, RaycastPick, ScreenSpacePick};

/// Anything that can map between world space and screen pixels
pub trait ScreenProjector {
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2>;
    fn screen_to_ray(&self, screen: Vec2) -> Option<Ray3d>;
}

/// Bevy camera adapter
pub struct CameraProjector<'a> {
    pub camera: &'a Camera,
    pub transform: &'a GlobalTransform,
}

impl ScreenProjector for CameraProjector<'_> {
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        self.camera.world_to_viewport(self.transform, world).ok()
    }

    fn screen_to_ray(&self, screen: Vec2) -> Option<Ray3d> {
        self.camera.viewport_to_world(self.transform, screen).ok()
    }
}

/// Straight-down orthographic view: `pixels_per_unit` pixels per world unit,
/// world origin at `center` on screen, +X right and +Z down.
#[derive(Clone, Copy, Debug)]
pub struct TopDownProjector {
    pub center: Vec2,
    pub pixels_per_unit: f32,
    pub eye_height: f32,
}

impl ScreenProjector for TopDownProjector {
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        if world.y > self.eye_height {
            return None;
        }
        Some(self.center + Vec2::new(world.x, world.z) * self.pixels_per_unit)
    }

    fn screen_to_ray(&self, screen: Vec2) -> Option<Ray3d> {
        let planar = (screen - self.center) / self.pixels_per_unit;
        Some(Ray3d::new(Vec3::new(planar.x, self.eye_height, planar.y), Dir3::NEG_Y))
    }
}

/// A resolution request: an explicit ray (first person) or a pointer position (isometric)
pub enum TargetQuery<'a> {
    Ray(Ray3d),
    Pointer {
        screen: Vec2,
        view: &'a dyn ScreenProjector,
    },
}

impl TargetQuery<'_> {
    /// World ray for geometric tests (ground is always resolved this way)
    pub fn ray(&self) -> Option<Ray3d> {
        match self {
            TargetQuery::Ray(ray) => Some(*ray),
            TargetQuery::Pointer { screen, view } => view.screen_to_ray(*screen),
        }
    }
}

/// Spatial resolver: minions, then buildings, then ground
pub struct TargetingSystem {
    strategy: Box<dyn PickStrategy>,
    highlight: HighlightTracker,
    config: PickConfig,
}

impl TargetingSystem {
    pub fn new(config: PickConfig, isometric: bool) -> Self {
        Self {
            strategy: strategy_for(isometric),
            highlight: HighlightTracker::default(),
            config,
        }
    }

    /// Swap the pick strategy; the public contract is unchanged
    pub fn set_isometric(&mut self, isometric: bool) {
        if self.strategy.is_screen_space() != isometric {
            info!("Targeting strategy: {}", if isometric { "screen-space" } else { "ray-cast" });
            self.strategy = strategy_for(isometric);
        }
    }

    pub fn is_isometric(&self) -> bool {
        self.strategy.is_screen_space()
    }

    /// Resolve and update the highlight to match the result
    pub fn resolve(&mut self, objects: &WorldObjects, query: &TargetQuery) -> Option<Target> {
        let target = self.pick(objects, query);
        self.highlight.update(target.as_ref());
        target
    }

    /// Resolve without touching highlight state
    pub fn pick(&self, objects: &WorldObjects, query: &TargetQuery) -> Option<Target> {
        for kind in TargetKind::PRIORITY {
            if kind == TargetKind::Ground {
                break;
            }
            let candidates: Vec<&RegisteredEntity> = objects
                .iter_kind(kind)
                .filter(|e| !matches!(e.claim(), Some(Claim::Grab) | Some(Claim::Move)))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            if let Some(target) = self.strategy.pick(kind, &candidates, query, &self.config) {
                return Some(target);
            }
        }
        self.pick_ground(objects, query)
    }

    /// Ground hit under the query, regardless of entities in front of it
    pub fn pick_ground(&self, objects: &WorldObjects, query: &TargetQuery) -> Option<Target> {
        let ground = objects.ground()?;
        let ray = query.ray()?;
        let (distance, point) = ray_height_field_intersection(
            ray.origin,
            *ray.direction,
            ground.heights.as_ref(),
            self.config.max_ray_distance,
            GROUND_MARCH_STEP,
        )?;
        let normal = ground.heights.normal_at(point.x, point.z);
        Some(Target::ground(point, normal, distance, ground.handle))
    }

    pub fn ground_point(&self, objects: &WorldObjects, query: &TargetQuery) -> Option<Vec3> {
        self.pick_ground(objects, query).map(|t| t.world_position)
    }

    pub fn highlight(&self) -> &HighlightTracker {
        &self.highlight
    }

    pub fn clear_highlight(&mut self) {
        self.highlight.clear();
    }

    /// Drop highlight state for an entity that left the registry
    pub fn forget(&mut self, id: &str) {
        if self.highlight.current_id() == Some(id) {
            self.highlight.clear();
        }
    }
}

fn strategy_for(isometric: bool) -> Box<dyn PickStrategy> {
    if isometric {
        Box::new(ScreenSpacePick)
    } else {
        Box::new(RaycastPick)
    }
}
