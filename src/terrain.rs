// Ground height sampling
// The interaction core only needs `(x, z) -> y`; the demo builds a noise height field.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Height query used for ground picking, grid cells and drop placement
pub trait HeightSampler: Send + Sync {
    fn height_at(&self, x: f32, z: f32) -> f32;

    /// Surface normal via central differences
    fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let offset = 0.25;
        let h_left = self.height_at(x - offset, z);
        let h_right = self.height_at(x + offset, z);
        let h_down = self.height_at(x, z - offset);
        let h_up = self.height_at(x, z + offset);

        let tangent_x = Vec3::new(2.0 * offset, h_right - h_left, 0.0);
        let tangent_z = Vec3::new(0.0, h_up - h_down, 2.0 * offset);

        // tangent_z x tangent_x points up for a flat surface
        tangent_z.cross(tangent_x).normalize_or(Vec3::Y)
    }
}

/// Infinite flat ground at a fixed height
#[derive(Clone, Copy, Debug)]
pub struct FlatGround(pub f32);

impl HeightSampler for FlatGround {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.0
    }

    fn normal_at(&self, _x: f32, _z: f32) -> Vec3 {
        Vec3::Y
    }
}

/// Heightmap data sampled with bilinear interpolation
#[derive(Resource, Clone, Debug)]
pub struct TerrainHeightmap {
    pub heights: Vec<Vec<f32>>,
    pub grid_size: usize,
    pub terrain_size: f32,
    pub cell_size: f32,
    pub base_height: f32,
}

impl TerrainHeightmap {
    /// Generate rolling hills using fractal Brownian motion, flattened toward the edges
    pub fn generate(seed: u32, grid_size: usize, terrain_size: f32, max_height: f32) -> Self {
        let grid_size = grid_size.max(2);
        let mut heights = vec![vec![0.0f32; grid_size]; grid_size];

        let fbm: Fbm<Perlin> = Fbm::new(seed)
            .set_octaves(2)
            .set_persistence(0.3)
            .set_lacunarity(2.0);

        let half_size = terrain_size / 2.0;
        let cell_size = terrain_size / (grid_size - 1) as f32;
        let noise_scale = 0.02;

        for (z, row) in heights.iter_mut().enumerate() {
            for (x, height) in row.iter_mut().enumerate() {
                let world_x = (x as f32 * cell_size) - half_size;
                let world_z = (z as f32 * cell_size) - half_size;

                let noise_val = fbm.get([world_x as f64 * noise_scale, world_z as f64 * noise_scale]);
                let normalized = (((noise_val + 1.0) * 0.5) as f32).clamp(0.0, 1.0);

                // Keep the border flat so the playable center has the relief
                let edge_dist_x = (half_size - world_x.abs()) / half_size;
                let edge_dist_z = (half_size - world_z.abs()) / half_size;
                let edge_factor = edge_dist_x.min(edge_dist_z).clamp(0.0, 1.0).powf(2.0);

                *height = normalized * max_height * edge_factor;
            }
        }

        Self {
            heights,
            grid_size,
            terrain_size,
            cell_size,
            base_height: 0.0,
        }
    }

    /// Create a flat heightmap at a specific base height
    pub fn flat(terrain_size: f32, base_height: f32) -> Self {
        let grid_size = 2;
        Self {
            heights: vec![vec![0.0; grid_size]; grid_size],
            grid_size,
            terrain_size,
            cell_size: terrain_size,
            base_height,
        }
    }

    /// Build a renderable mesh for the height field
    pub fn build_mesh(&self) -> Mesh {
        let grid_size = self.grid_size;
        let half_size = self.terrain_size / 2.0;

        let vertex_count = grid_size * grid_size;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for z in 0..grid_size {
            for x in 0..grid_size {
                let world_x = (x as f32 * self.cell_size) - half_size;
                let world_z = (z as f32 * self.cell_size) - half_size;
                positions.push([world_x, self.base_height + self.heights[z][x], world_z]);
                let normal = self.normal_at(world_x, world_z);
                normals.push([normal.x, normal.y, normal.z]);
                uvs.push([x as f32 * 0.5, z as f32 * 0.5]);
            }
        }

        let mut indices = Vec::with_capacity((grid_size - 1) * (grid_size - 1) * 6);
        for z in 0..(grid_size - 1) {
            for x in 0..(grid_size - 1) {
                let top_left = (z * grid_size + x) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((z + 1) * grid_size + x) as u32;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
            }
        }

        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, bevy::asset::RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_indices(Indices::U32(indices));

        mesh
    }
}

impl HeightSampler for TerrainHeightmap {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        // Convert world coordinates to grid coordinates
        let half_size = self.terrain_size / 2.0;
        let grid_x = ((x + half_size) / self.cell_size).clamp(0.0, (self.grid_size - 1) as f32);
        let grid_z = ((z + half_size) / self.cell_size).clamp(0.0, (self.grid_size - 1) as f32);

        let x0 = grid_x.floor() as usize;
        let z0 = grid_z.floor() as usize;
        let x1 = (x0 + 1).min(self.grid_size - 1);
        let z1 = (z0 + 1).min(self.grid_size - 1);

        let fx = grid_x.fract();
        let fz = grid_z.fract();

        // Bilinear interpolation
        let h00 = self.heights[z0][x0];
        let h10 = self.heights[z0][x1];
        let h01 = self.heights[z1][x0];
        let h11 = self.heights[z1][x1];

        let h0 = h00 * (1.0 - fx) + h10 * fx;
        let h1 = h01 * (1.0 - fx) + h11 * fx;

        self.base_height + h0 * (1.0 - fz) + h1 * fz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_heightmap_samples_base_height() {
        let hm = TerrainHeightmap::flat(100.0, -1.0);
        assert_eq!(hm.height_at(0.0, 0.0), -1.0);
        assert_eq!(hm.height_at(49.0, -49.0), -1.0);
        assert!((hm.normal_at(3.0, 3.0) - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_generated_heightmap_is_deterministic_and_bounded() {
        let a = TerrainHeightmap::generate(7, 17, 64.0, 4.0);
        let b = TerrainHeightmap::generate(7, 17, 64.0, 4.0);
        assert_eq!(a.heights, b.heights);
        for row in &a.heights {
            for &h in row {
                assert!((0.0..=4.0 + 1e-4).contains(&h));
            }
        }
    }

    #[test]
    fn test_sampling_interpolates_between_vertices() {
        let mut hm = TerrainHeightmap::flat(10.0, 0.0);
        hm.heights[0][1] = 2.0; // (x = +5, z = -5)
        let mid = hm.height_at(0.0, -5.0);
        assert!((mid - 1.0).abs() < 1e-4);
    }
}
