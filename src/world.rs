//! Snapshot types - the serializable view of the grid handed to a renderer.
//!
//! The engine owns no rendering or frame pacing; a host engine drives it and
//! pulls one of these per frame it wants to draw. `GridSnapshot` is a plain
//! value: taking one never mutates simulation state.

use crate::chunk::ChunkMap;
use crate::grid::CellGrid;
use crate::material::{MaterialId, MaterialRegistry};
use serde::{Deserialize, Serialize};

/// Census entry for one material with at least one cell on the grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCount {
    pub id: u8,
    pub name: String,
    pub cells: usize,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Step counter at the moment of the snapshot.
    pub step: u64,
    pub width: i32,
    pub height: i32,
    /// Material id per cell, row-major, y = 0 at the top. Velocities and
    /// accumulators are simulation-internal and deliberately not exported.
    pub materials: Vec<u8>,
    /// Chunk grid dimensions.
    pub chunks_x: i32,
    pub chunks_y: i32,
    /// Per-chunk activity flags, row-major. Lets a renderer draw debug
    /// overlays or skip redrawing quiet regions.
    pub activity: Vec<bool>,
    /// Number of chunks that would simulate next step.
    pub active_chunks: usize,
    /// Cells per non-empty material.
    pub census: Vec<MaterialCount>,
}

impl GridSnapshot {
    /// Build a snapshot from the engine's internals.
    pub fn from_parts(
        grid: &CellGrid,
        chunks: &ChunkMap,
        registry: &MaterialRegistry,
        step: u64,
    ) -> Self {
        let materials = grid.cells().iter().map(|c| c.material.0).collect();

        let counts = grid.census();
        let mut census = Vec::new();
        for (id, &cells) in counts.iter().enumerate().skip(1) {
            if cells > 0 {
                census.push(MaterialCount {
                    id: id as u8,
                    name: registry.lookup(MaterialId(id as u8)).name.clone(),
                    cells,
                });
            }
        }

        Self {
            step,
            width: grid.width(),
            height: grid.height(),
            materials,
            chunks_x: chunks.chunks_x(),
            chunks_y: chunks.chunks_y(),
            activity: chunks.activity_plane(),
            active_chunks: chunks.active_chunk_count(),
            census,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::DEFAULT_CHUNK_SIZE;
    use crate::grid::Cell;
    use crate::material::{SAND, WATER};

    #[test]
    fn test_snapshot_reflects_grid() {
        let registry = MaterialRegistry::default_set();
        let mut grid = CellGrid::new(128, 64);
        let chunks = ChunkMap::new(128, 64, DEFAULT_CHUNK_SIZE);
        grid.set(3, 4, Cell::of(SAND));
        grid.set(4, 4, Cell::of(WATER));
        grid.set(5, 4, Cell::of(WATER));

        let snap = GridSnapshot::from_parts(&grid, &chunks, &registry, 7);
        assert_eq!(snap.step, 7);
        assert_eq!(snap.materials.len(), 128 * 64);
        assert_eq!(snap.materials[(4 * 128 + 3) as usize], SAND.0);

        let sand = snap.census.iter().find(|m| m.id == SAND.0).unwrap();
        assert_eq!(sand.cells, 1);
        assert_eq!(sand.name, "sand");
        let water = snap.census.iter().find(|m| m.id == WATER.0).unwrap();
        assert_eq!(water.cells, 2);
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let registry = MaterialRegistry::default_set();
        let grid = CellGrid::new(16, 16);
        let chunks = ChunkMap::new(16, 16, DEFAULT_CHUNK_SIZE);
        let snap = GridSnapshot::from_parts(&grid, &chunks, &registry, 0);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"materials\""));
        let back: GridSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.width, 16);
        assert_eq!(back.materials, snap.materials);
    }
}
