//! Cell storage - the flat array of per-cell simulation state.
//!
//! `CellGrid` owns every cell and exposes bounds-checked access; out-of-bounds
//! reads and writes are no-ops returning `None`, never an error, so the
//! per-cell hot path stays free of exceptional control flow. During a step the
//! kernel reaches the same storage through `SharedCells`, a raw view whose
//! safety rests on the chunk partition invariant (see `chunk`).

use crate::material::MaterialId;
use std::marker::PhantomData;

/// Velocity components are domain-clamped to this range for movable materials.
pub const VELOCITY_CLAMP: i8 = 16;

/// Clamp a velocity value into the movable-material domain.
#[inline]
pub fn clamp_velocity(v: i32) -> i8 {
    v.clamp(-(VELOCITY_CLAMP as i32), VELOCITY_CLAMP as i32) as i8
}

/// One grid slot.
///
/// `gravity` is the fractional gravity accumulator: integer velocity storage
/// would otherwise quantize acceleration, so sub-unit gravity builds up here
/// and carries into `vy` one whole unit at a time. `stamp` records the low
/// bits of the step that last processed this cell, so a cell that moved into
/// rows the scan has not reached yet is not processed twice in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub material: MaterialId,
    pub vx: i8,
    pub vy: i8,
    pub gravity: u8,
    pub stamp: u8,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        material: MaterialId::EMPTY,
        vx: 0,
        vy: 0,
        gravity: 0,
        stamp: 0,
    };

    /// Create a resting cell of the given material.
    pub fn of(material: MaterialId) -> Self {
        Cell {
            material,
            ..Cell::EMPTY
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }
}

/// The flat array of per-cell state (row-major, y = 0 at the top, gravity
/// pulls toward increasing y).
pub struct CellGrid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    /// Get a cell by grid coordinates. Out of bounds reads return `None`.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Overwrite a cell. Out-of-bounds writes are silently dropped; returns
    /// whether the write landed.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    /// Raw cell data, exposed for snapshot extraction.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Count cells per material id. Used by mass-conservation checks and
    /// observability counters.
    pub fn census(&self) -> [usize; 256] {
        let mut counts = [0usize; 256];
        for cell in &self.cells {
            counts[cell.material.index()] += 1;
        }
        counts
    }

    /// Shared view for the duration of one scheduling group. The caller
    /// guarantees that concurrent users write disjoint windows.
    pub fn shared(&mut self) -> SharedCells<'_> {
        SharedCells {
            ptr: self.cells.as_mut_ptr(),
            width: self.width,
            height: self.height,
            _grid: PhantomData,
        }
    }
}

/// Unsynchronized view of the cell array handed to concurrently running chunk
/// tasks.
///
/// There is deliberately no cell-level synchronization here: within one
/// scheduling group every task writes only inside its own processing window,
/// and same-group windows never overlap (the partition invariant in `chunk`).
/// That spatial disjointness is the entire safety argument; violating it by
/// raising the velocity clamp or shrinking the chunk margin is undefined
/// behavior, which is why those constants are tied together by tests.
#[derive(Clone, Copy)]
pub struct SharedCells<'a> {
    ptr: *mut Cell,
    width: i32,
    height: i32,
    _grid: PhantomData<&'a mut Cell>,
}

// SAFETY: tasks in the same scheduling group access disjoint windows of the
// cell array, and groups are separated by a barrier in the scheduler.
unsafe impl Send for SharedCells<'_> {}
unsafe impl Sync for SharedCells<'_> {}

impl SharedCells<'_> {
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Read a cell. Out of bounds returns `None`.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if self.in_bounds(x, y) {
            // SAFETY: index is in bounds; no concurrent writer touches this
            // cell outside the caller's own window (partition invariant).
            Some(unsafe { *self.ptr.add((y * self.width + x) as usize) })
        } else {
            None
        }
    }

    /// Write a cell. Out-of-bounds writes are dropped.
    #[inline]
    pub fn set(&self, x: i32, y: i32, cell: Cell) {
        if self.in_bounds(x, y) {
            // SAFETY: as for `get`; the caller's window is the only writer.
            unsafe { *self.ptr.add((y * self.width + x) as usize) = cell };
        }
    }
}
