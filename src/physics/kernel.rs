//! Per-chunk scan loop and the window through which all kernel access flows.

use crate::chunk::{CellRect, ChunkCoord, ChunkMap};
use crate::grid::{Cell, SharedCells};
use crate::material::{BehaviorType, MaterialRegistry};
use crate::physics::{movement, settle, ChunkRng};

/// Result of probing a candidate target cell.
pub(crate) enum Probe {
    /// Target is Empty; the mover may enter.
    Open,
    /// Target holds a movable material of strictly lower density; the cells
    /// may swap.
    Displace(Cell),
    /// Solid, denser, out of window or out of grid. Treated identically:
    /// no move, no error.
    Blocked,
}

/// A chunk task's view of the world for one step.
///
/// Every read and write is confined to the chunk's processing window; probes
/// outside it report `Blocked` and writes outside it are dropped. Combined
/// with the partition invariant this is what makes same-group tasks safe to
/// run under any interleaving.
pub(crate) struct ChunkWindow<'a> {
    cells: SharedCells<'a>,
    window: CellRect,
    chunks: &'a ChunkMap,
    registry: &'a MaterialRegistry,
    pub rng: ChunkRng,
    /// Stamp written into cells that move this step, so the scan does not
    /// process them a second time. Never zero, the fresh-cell stamp.
    pub stamp: u8,
}

impl<'a> ChunkWindow<'a> {
    #[inline]
    pub fn registry(&self) -> &MaterialRegistry {
        self.registry
    }

    /// Read a cell inside the window. Outside the window (or the grid) there
    /// is nothing to see: `None`.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if self.window.contains(x, y) {
            self.cells.get(x, y)
        } else {
            None
        }
    }

    /// Write a cell inside the window, flagging the owning chunk dirty when
    /// the stored value actually changes. Writes outside the window are
    /// dropped.
    pub fn put(&self, x: i32, y: i32, cell: Cell) {
        if !self.window.contains(x, y) {
            return;
        }
        if self.cells.get(x, y) == Some(cell) {
            return;
        }
        self.cells.set(x, y, cell);
        self.chunks.mark_dirty(x, y);
    }

    /// Probe the cell at (x, y) as a movement target for a mover of the
    /// given density.
    pub fn probe(&self, mover_density: u8, x: i32, y: i32) -> Probe {
        match self.get(x, y) {
            None => Probe::Blocked,
            Some(c) if c.is_empty() => Probe::Open,
            Some(c) => {
                let def = self.registry.lookup(c.material);
                if def.behavior.is_movable() && def.density < mover_density {
                    Probe::Displace(c)
                } else {
                    Probe::Blocked
                }
            }
        }
    }

    /// Whether the cell at (x, y) is Empty (out of window counts as not).
    #[inline]
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        matches!(self.get(x, y), Some(c) if c.is_empty())
    }
}

/// Stamp value for a step: low bits of the counter, biased away from zero so
/// it never collides with the fresh-cell default. A cell that last moved
/// exactly 255 steps ago can be skipped for one step by the wraparound; such
/// cells have been resting the whole time, so nothing visible comes of it.
#[inline]
fn step_stamp(step: u64) -> u8 {
    (step % 255) as u8 + 1
}

/// Run the three-phase kernel over one chunk.
///
/// Rows are processed bottom to top so a row's final state is fixed before
/// the row above attempts to move into it; scan direction alternates per row
/// (keyed off step and row parity) to avoid directional bias.
pub fn simulate_chunk(
    cells: SharedCells<'_>,
    chunks: &ChunkMap,
    registry: &MaterialRegistry,
    coord: ChunkCoord,
    step: u64,
) {
    let bounds = chunks.bounds(coord);
    let mut win = ChunkWindow {
        cells,
        window: chunks.window(coord),
        chunks,
        registry,
        rng: ChunkRng::new(step, coord),
        stamp: step_stamp(step),
    };

    for y in (bounds.y0..bounds.y1).rev() {
        if (step + y as u64) % 2 == 0 {
            for x in bounds.x0..bounds.x1 {
                update_cell(&mut win, x, y);
            }
        } else {
            for x in (bounds.x0..bounds.x1).rev() {
                update_cell(&mut win, x, y);
            }
        }
    }
}

fn update_cell(win: &mut ChunkWindow<'_>, x: i32, y: i32) {
    let Some(cell) = win.get(x, y) else {
        return;
    };
    let behavior = win.registry.behavior(cell.material);
    if behavior.is_static() {
        return;
    }
    // Already moved here earlier this step (e.g. a gas that rose into rows
    // the scan has not reached yet, or a neighbor group's write).
    if cell.stamp == win.stamp {
        return;
    }

    let outcome = movement::apply(win, x, y, cell, behavior);
    settle::friction(win, &outcome);
    if behavior == BehaviorType::Powder || behavior == BehaviorType::Gas {
        settle::rest(win, outcome.x, outcome.y, behavior);
    }
}
