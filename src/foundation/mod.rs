// Foundation drawing - sparse grid selection finalized into a foundation footprint
//
// Submodules:
// - grid: snapping and Bresenham path rasterization
// - visuals: cell quads that mirror the drawer's hover / selection state

pub mod grid;
pub mod visuals;

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::GridConfig;
use crate::terrain::HeightSampler;

pub use grid::{cell_center, cells_on_path, snap_point, snap_to_grid};

/// A materialized cell of the drawing session
#[derive(Clone, Debug)]
pub struct GridCell {
    pub coord: IVec2,
    pub world_position: Vec3,
    pub visual: Option<Entity>,
}

/// Hover and selection feedback never mix: selection wins
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellTint {
    Idle,
    Hover,
    Selected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoundationBounds {
    pub min: Vec3,
    pub max: Vec3,
}

/// Immutable result of a successful draw
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnFoundation {
    pub cells: HashSet<IVec2>,
    pub cell_size: f32,
    pub grid_min: IVec2,
    pub grid_max: IVec2,
    pub bounds: FoundationBounds,
    pub center: Vec3,
    pub area: usize,
    pub complete: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum StrokeMode {
    Select,
    Erase,
}

#[derive(Clone, Copy, Debug)]
struct Stroke {
    last_cell: IVec2,
    mode: StrokeMode,
}

pub struct FoundationDrawer {
    config: GridConfig,
    active: bool,
    cells: HashMap<IVec2, GridCell>,
    selected: HashSet<IVec2>,
    hovered: Option<IVec2>,
    stroke: Option<Stroke>,
    retired_visuals: Vec<Entity>,
}

impl FoundationDrawer {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            active: false,
            cells: HashMap::new(),
            selected: HashSet::new(),
            hovered: None,
            stroke: None,
            retired_visuals: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, cell: IVec2) -> bool {
        self.selected.contains(&cell)
    }

    pub fn hovered_cell(&self) -> Option<IVec2> {
        self.hovered
    }

    /// World position of the hovered cell (the drawing cursor)
    pub fn cursor_position(&self) -> Option<Vec3> {
        self.hovered
            .and_then(|c| self.cells.get(&c))
            .map(|cell| cell.world_position)
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.values()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn tint(&self, cell: IVec2) -> CellTint {
        if self.selected.contains(&cell) {
            CellTint::Selected
        } else if self.hovered == Some(cell) {
            CellTint::Hover
        } else {
            CellTint::Idle
        }
    }

    /// Begin a session around the origin point; a running session is discarded first
    pub fn start_drawing(&mut self, origin: Vec3, heights: &dyn HeightSampler) {
        if self.active {
            self.cancel_drawing();
        }
        let cell = snap_to_grid(origin, self.config.cell_size);
        self.active = true;
        self.materialize_around(cell, heights);
        self.hovered = Some(cell);
        info!("Foundation drawing started at cell {:?}", cell);
    }

    /// Start a stroke. Non-additive presses replace the selection; an additive press on a
    /// selected cell starts an erase stroke.
    pub fn handle_pointer_down(&mut self, point: Vec3, additive: bool, heights: &dyn HeightSampler) -> bool {
        if !self.active {
            return false;
        }
        let cell = snap_to_grid(point, self.config.cell_size);
        self.materialize_around(cell, heights);

        if !additive {
            self.selected.clear();
        }
        let mode = if additive && self.selected.contains(&cell) {
            StrokeMode::Erase
        } else {
            StrokeMode::Select
        };
        self.apply(cell, mode);
        self.stroke = Some(Stroke { last_cell: cell, mode });
        self.hovered = Some(cell);
        true
    }

    /// Track hover; while a stroke is active, rasterize from the previous stroke cell
    pub fn update_pointer(&mut self, point: Vec3, heights: &dyn HeightSampler) {
        if !self.active {
            return;
        }
        let cell = snap_to_grid(point, self.config.cell_size);
        if self.hovered != Some(cell) {
            self.materialize_around(cell, heights);
            self.hovered = Some(cell);
        }

        let Some(mut stroke) = self.stroke else { return };
        if stroke.last_cell == cell {
            return;
        }
        // Rasterize from the previous stroke cell, not the drag start
        for path_cell in cells_on_path(stroke.last_cell, cell) {
            self.ensure_cell(path_cell, heights);
            self.apply(path_cell, stroke.mode);
        }
        stroke.last_cell = cell;
        self.stroke = Some(stroke);
    }

    pub fn handle_pointer_up(&mut self, point: Vec3, heights: &dyn HeightSampler) {
        if !self.active {
            return;
        }
        self.update_pointer(point, heights);
        self.stroke = None;
    }

    pub fn can_complete(&self) -> bool {
        self.active && self.selected.len() >= self.config.min_cells
    }

    /// Snapshot the selection. Below the minimum the session is cancelled and `None` returned.
    /// Live selection state is cleared either way.
    pub fn finish_drawing(&mut self) -> Option<DrawnFoundation> {
        if !self.active {
            return None;
        }
        if !self.can_complete() {
            info!(
                "Foundation incomplete: {} of {} cells, cancelling",
                self.selected.len(),
                self.config.min_cells
            );
            self.cancel_drawing();
            return None;
        }

        let foundation = self.snapshot();
        if let Some(f) = &foundation {
            info!("Foundation complete: {} cells centered at {:?}", f.area, f.center);
        }
        self.reset();
        foundation
    }

    pub fn cancel_drawing(&mut self) {
        if self.active {
            info!("Foundation drawing cancelled");
        }
        self.reset();
    }

    pub fn has_retired_visuals(&self) -> bool {
        !self.retired_visuals.is_empty()
    }

    /// Visual entities of cells discarded since the last call
    pub fn take_retired_visuals(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.retired_visuals)
    }

    /// Record the quad spawned for a cell
    pub fn attach_visual(&mut self, cell: IVec2, visual: Entity) {
        match self.cells.get_mut(&cell) {
            Some(grid_cell) => grid_cell.visual = Some(visual),
            None => self.retired_visuals.push(visual),
        }
    }

    fn snapshot(&self) -> Option<DrawnFoundation> {
        if self.selected.is_empty() {
            return None;
        }
        let cs = self.config.cell_size;
        let mut grid_min = IVec2::MAX;
        let mut grid_max = IVec2::MIN;
        let mut y_min = f32::MAX;
        let mut y_max = f32::MIN;

        for cell in &self.selected {
            grid_min = grid_min.min(*cell);
            grid_max = grid_max.max(*cell);
            let y = self.cells.get(cell).map(|c| c.world_position.y).unwrap_or(0.0);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        let min_center = cell_center(grid_min, cs);
        let max_center = cell_center(grid_max, cs);
        let half = cs * 0.5;
        let bounds = FoundationBounds {
            min: Vec3::new(min_center.x - half, y_min, min_center.y - half),
            max: Vec3::new(max_center.x + half, y_max, max_center.y + half),
        };

        Some(DrawnFoundation {
            cells: self.selected.clone(),
            cell_size: cs,
            grid_min,
            grid_max,
            bounds,
            center: (bounds.min + bounds.max) * 0.5,
            area: self.selected.len(),
            complete: true,
        })
    }

    fn apply(&mut self, cell: IVec2, mode: StrokeMode) {
        match mode {
            StrokeMode::Select => {
                self.selected.insert(cell);
            }
            StrokeMode::Erase => {
                self.selected.remove(&cell);
            }
        }
    }

    fn materialize_around(&mut self, center: IVec2, heights: &dyn HeightSampler) {
        let r = self.config.materialize_radius.max(0);
        for dz in -r..=r {
            for dx in -r..=r {
                self.ensure_cell(center + IVec2::new(dx, dz), heights);
            }
        }
    }

    fn ensure_cell(&mut self, coord: IVec2, heights: &dyn HeightSampler) {
        let cs = self.config.cell_size;
        self.cells.entry(coord).or_insert_with(|| {
            let center = cell_center(coord, cs);
            GridCell {
                coord,
                world_position: Vec3::new(center.x, heights.height_at(center.x, center.y), center.y),
                visual: None,
            }
        });
    }

    fn reset(&mut self) {
        self.retired_visuals
            .extend(self.cells.drain().filter_map(|(_, cell)| cell.visual));
        self.selected.clear();
        self.hovered = None;
        self.stroke = None;
        self.active = false;
    }
}
