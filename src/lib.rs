//! Chunked falling-sand simulation core.
//!
//! A deterministic cellular grid of powders, liquids, gases and solids,
//! partitioned into chunks that simulate in four conflict-free parallel
//! waves per step. A host engine drives it: write cells, call `step()`,
//! pull snapshots.

pub mod api;
pub mod chunk;
pub mod grid;
pub mod material;
pub mod physics;
pub mod profiler;
pub mod scheduler;
pub mod world;

pub use api::{SandWorld, SimConfig};
pub use chunk::{ChunkCoord, ChunkGroup, ChunkMap, DEFAULT_CHUNK_SIZE};
pub use grid::{Cell, CellGrid};
pub use material::{
    BehaviorType, ConfigError, MaterialDef, MaterialId, MaterialRegistry, SAND, STEAM, STONE, WATER,
};
pub use profiler::{Profiler, SectionStats, StepSection, StressProfiler};
pub use scheduler::GroupScheduler;
pub use world::GridSnapshot;
