// World grid helpers - snapping and integer line rasterization
use bevy::prelude::*;

/// Integer cell containing a world point: `round(coord / cell_size)` on X and Z
#[inline]
pub fn snap_to_grid(point: Vec3, cell_size: f32) -> IVec2 {
    IVec2::new(
        (point.x / cell_size).round() as i32,
        (point.z / cell_size).round() as i32,
    )
}

/// Center of a cell on the XZ plane
#[inline]
pub fn cell_center(cell: IVec2, cell_size: f32) -> Vec2 {
    cell.as_vec2() * cell_size
}

/// Move a point onto its cell center, keeping its height
#[inline]
pub fn snap_point(point: Vec3, cell_size: f32) -> Vec3 {
    let center = cell_center(snap_to_grid(point, cell_size), cell_size);
    Vec3::new(center.x, point.y, center.y)
}

/// Bresenham line between two cells (8-connected, both endpoints included)
pub fn cells_on_path(from: IVec2, to: IVec2) -> Vec<IVec2> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let mut x = from.x;
    let mut y = from.y;

    loop {
        cells.push(IVec2::new(x, y));
        if x == to.x && y == to.y {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    cells
}
