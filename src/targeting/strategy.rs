// Pick strategies - how a single candidate pool is searched
use bevy::prelude::*;

use crate::config::PickConfig;
use crate::math_utils::{ray_obb_intersection, ray_sphere_intersection};
use crate::registry::RegisteredEntity;
use crate::types::*;

use super::TargetQuery;

/// Finds the best candidate of one kind; `None` lets the resolver fall through to the next pool
pub trait PickStrategy: Send + Sync {
    fn pick(
        &self,
        kind: TargetKind,
        candidates: &[&RegisteredEntity],
        query: &TargetQuery,
        config: &PickConfig,
    ) -> Option<Target>;

    fn is_screen_space(&self) -> bool;
}

/// First-person: intersect the query ray with entity geometry
pub struct RaycastPick;

impl PickStrategy for RaycastPick {
    fn pick(
        &self,
        kind: TargetKind,
        candidates: &[&RegisteredEntity],
        query: &TargetQuery,
        config: &PickConfig,
    ) -> Option<Target> {
        let ray = query.ray()?;
        let origin = ray.origin;
        let direction = *ray.direction;

        let mut best: Option<Target> = None;
        for entity in candidates {
            let Some((distance, point, normal)) = ray_hit(entity, origin, direction) else {
                continue;
            };
            if distance > config.max_ray_distance {
                continue;
            }
            if best.as_ref().is_some_and(|b| b.distance <= distance) {
                continue;
            }
            best = Some(entity_target(kind, entity, point, normal, distance));
        }
        best
    }

    fn is_screen_space(&self) -> bool {
        false
    }
}

/// Minions are spheres, buildings are oriented boxes
fn ray_hit(entity: &RegisteredEntity, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3, Vec3)> {
    let center = entity.transform.translation;
    match entity.kind {
        TargetKind::Minion => {
            let radius = entity.half_extents.max_element();
            let (distance, point) = ray_sphere_intersection(origin, direction, center, radius)?;
            Some((distance, point, (point - center).normalize_or(Vec3::Y)))
        }
        _ => ray_obb_intersection(origin, direction, center, entity.transform.rotation, entity.half_extents),
    }
}

/// Isometric: project anchors to the screen and take the nearest within a pixel radius
pub struct ScreenSpacePick;

impl PickStrategy for ScreenSpacePick {
    fn pick(
        &self,
        kind: TargetKind,
        candidates: &[&RegisteredEntity],
        query: &TargetQuery,
        config: &PickConfig,
    ) -> Option<Target> {
        let TargetQuery::Pointer { screen, view } = query else {
            // No projector available; fall back to geometry
            return RaycastPick.pick(kind, candidates, query, config);
        };

        let radius = match kind {
            TargetKind::Building => config.building_pixel_radius,
            _ => config.minion_pixel_radius,
        };
        let eye = query.ray().map(|r| r.origin);

        let mut best: Option<(f32, &RegisteredEntity)> = None;
        for entity in candidates {
            let anchor = entity.transform.translation;
            let Some(projected) = view.world_to_screen(anchor) else {
                continue; // Behind the camera
            };
            let pixel_distance = projected.distance(*screen);
            if pixel_distance > radius {
                continue;
            }
            if best.is_some_and(|(d, _)| d <= pixel_distance) {
                continue;
            }
            best = Some((pixel_distance, entity));
        }

        best.map(|(_, entity)| {
            let anchor = entity.transform.translation;
            let distance = eye.map(|e| e.distance(anchor)).unwrap_or(0.0);
            entity_target(kind, entity, anchor, Vec3::Y, distance)
        })
    }

    fn is_screen_space(&self) -> bool {
        true
    }
}

fn entity_target(kind: TargetKind, entity: &RegisteredEntity, point: Vec3, normal: Vec3, distance: f32) -> Target {
    Target {
        kind,
        id: Some(entity.id.clone()),
        world_position: point,
        surface_normal: normal,
        distance,
        entity: Some(entity.handle),
        metadata: entity.metadata.clone(),
    }
}
