use bevy::prelude::*;
use crate::terrain::HeightSampler;

/// Ray-sphere intersection test
/// Returns Some((distance, hit_point)) if ray intersects sphere, None otherwise
pub fn ray_sphere_intersection(
    ray_origin: Vec3,
    ray_direction: Vec3,
    sphere_center: Vec3,
    sphere_radius: f32,
) -> Option<(f32, Vec3)> {
    let oc = ray_origin - sphere_center;
    let a = ray_direction.dot(ray_direction);
    let b = 2.0 * oc.dot(ray_direction);
    let c = oc.dot(oc) - sphere_radius * sphere_radius;
    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return None;
    }

    // Find nearest intersection point (entry point into sphere)
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    if t > 0.0 {
        let hit_point = ray_origin + ray_direction * t;
        return Some((t, hit_point));
    }

    // Check far intersection (exit point, in case we're inside the sphere)
    let t2 = (-b + discriminant.sqrt()) / (2.0 * a);
    if t2 > 0.0 {
        let hit_point = ray_origin + ray_direction * t2;
        return Some((t2, hit_point));
    }

    None
}

/// Ray vs oriented box (center, rotation, half extents in world units)
/// Returns Some((distance, hit_point, surface_normal)) for the entry face
pub fn ray_obb_intersection(
    ray_origin: Vec3,
    ray_direction: Vec3,
    center: Vec3,
    rotation: Quat,
    half_extents: Vec3,
) -> Option<(f32, Vec3, Vec3)> {
    // Work in box-local space
    let inverse = rotation.inverse();
    let local_origin = inverse * (ray_origin - center);
    let local_dir = inverse * ray_direction;

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut entry_axis = 0;
    let mut entry_sign = 1.0;

    for axis in 0..3 {
        let origin = local_origin[axis];
        let dir = local_dir[axis];
        let extent = half_extents[axis];

        if dir.abs() < 1e-6 {
            // Parallel to this slab - must already be inside it
            if origin < -extent || origin > extent {
                return None;
            }
            continue;
        }

        let mut t0 = (-extent - origin) / dir;
        let mut t1 = (extent - origin) / dir;
        let mut sign = -1.0;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
            sign = 1.0;
        }
        if t0 > t_min {
            t_min = t0;
            entry_axis = axis;
            entry_sign = sign;
        }
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }

    // Origin inside the box: report the exit point
    let (t, normal_sign) = if t_min > 0.0 { (t_min, entry_sign) } else { (t_max, -entry_sign) };

    let mut local_normal = Vec3::ZERO;
    local_normal[entry_axis] = normal_sign;

    Some((t, ray_origin + ray_direction * t, rotation * local_normal))
}

/// Ray vs height field: march in fixed steps until the ray dips below the surface,
/// then bisect the bracketing interval.
pub fn ray_height_field_intersection(
    ray_origin: Vec3,
    ray_direction: Vec3,
    heights: &dyn HeightSampler,
    max_distance: f32,
    step: f32,
) -> Option<(f32, Vec3)> {
    let direction = ray_direction.normalize_or_zero();
    if direction == Vec3::ZERO || step <= 0.0 {
        return None;
    }

    let above = |t: f32| {
        let p = ray_origin + direction * t;
        p.y - heights.height_at(p.x, p.z)
    };

    if above(0.0) <= 0.0 {
        // Starting under the surface
        return None;
    }

    let mut prev_t = 0.0;
    let mut t = step;
    while t <= max_distance + step {
        let t_clamped = t.min(max_distance);
        if above(t_clamped) <= 0.0 {
            let (mut lo, mut hi) = (prev_t, t_clamped);
            for _ in 0..24 {
                let mid = (lo + hi) * 0.5;
                if above(mid) > 0.0 {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            return Some((hi, ray_origin + direction * hi));
        }
        if t_clamped >= max_distance {
            break;
        }
        prev_t = t_clamped;
        t += step;
    }

    None
}

/// Step `current` toward `target` by at most `max_delta`
#[inline]
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let offset = target - current;
    let distance = offset.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + offset / distance * max_delta
    }
}
