//! Chunk partitioning and activity tracking.
//!
//! The grid is split into fixed-size square chunks, the unit of parallel
//! work. Chunks are assigned to one of four scheduling groups by coordinate
//! parity; two chunks in the same group are always at least two chunk-widths
//! apart, so their processing windows (chunk bounds expanded by the margin)
//! can never overlap. That spacing is the entire concurrency guarantee: the
//! scheduler may run all of a group's chunks in parallel without any locking,
//! as long as no cell ever moves further than the margin in one step.

use std::sync::atomic::{AtomicBool, Ordering};

/// Default chunk edge length in cells.
pub const DEFAULT_CHUNK_SIZE: i32 = 64;

/// Upper bound on how far any cell can travel in one step: the velocity clamp
/// plus the worst-case diagonal slide and lateral dispersion. Must stay
/// strictly below the chunk margin; the tie between these numbers is verified
/// by tests, not checked at runtime.
pub const MAX_STEP_DISPLACEMENT: i32 = 27;

/// Integer coordinates of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Scheduling group from coordinate parity.
    #[inline]
    pub fn group(self) -> ChunkGroup {
        ChunkGroup::from_index(((self.cx & 1) | ((self.cy & 1) << 1)) as usize)
    }
}

/// The four-way partition of chunks that makes same-group parallelism safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkGroup {
    A,
    B,
    C,
    D,
}

impl ChunkGroup {
    /// Fixed dispatch order of one simulation step.
    pub const ALL: [ChunkGroup; 4] = [ChunkGroup::A, ChunkGroup::B, ChunkGroup::C, ChunkGroup::D];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            ChunkGroup::A => 0,
            ChunkGroup::B => 1,
            ChunkGroup::C => 2,
            ChunkGroup::D => 3,
        }
    }

    #[inline]
    fn from_index(i: usize) -> Self {
        match i & 3 {
            0 => ChunkGroup::A,
            1 => ChunkGroup::B,
            2 => ChunkGroup::C,
            _ => ChunkGroup::D,
        }
    }
}

/// Inclusive-exclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl CellRect {
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    fn intersects(&self, other: &CellRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

/// Partition of the grid into chunks plus per-chunk activity metadata.
///
/// `dirty` is atomic because a chunk's cells can be written by up to four
/// same-group neighbor tasks whose windows reach into it; each flips the flag
/// with a relaxed store. `active_last_step` and `has_structure` are only
/// touched by the scheduler between groups and by external callers between
/// steps, so they stay plain bools.
pub struct ChunkMap {
    chunk_size: i32,
    chunks_x: i32,
    chunks_y: i32,
    grid_width: i32,
    grid_height: i32,
    dirty: Vec<AtomicBool>,
    active_last_step: Vec<bool>,
    has_structure: Vec<bool>,
}

impl ChunkMap {
    pub fn new(grid_width: i32, grid_height: i32, chunk_size: i32) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        debug_assert!(
            MAX_STEP_DISPLACEMENT < chunk_size / 2,
            "per-step displacement must stay below the chunk margin"
        );
        let chunks_x = (grid_width + chunk_size - 1) / chunk_size;
        let chunks_y = (grid_height + chunk_size - 1) / chunk_size;
        let count = (chunks_x * chunks_y) as usize;
        Self {
            chunk_size,
            chunks_x,
            chunks_y,
            grid_width,
            grid_height,
            dirty: (0..count).map(|_| AtomicBool::new(false)).collect(),
            active_last_step: vec![false; count],
            has_structure: vec![false; count],
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Margin by which a chunk's processing window extends past its bounds.
    #[inline]
    pub fn margin(&self) -> i32 {
        self.chunk_size / 2
    }

    #[inline]
    pub fn chunks_x(&self) -> i32 {
        self.chunks_x
    }

    #[inline]
    pub fn chunks_y(&self) -> i32 {
        self.chunks_y
    }

    #[inline]
    fn index(&self, coord: ChunkCoord) -> Option<usize> {
        if coord.cx >= 0 && coord.cx < self.chunks_x && coord.cy >= 0 && coord.cy < self.chunks_y {
            Some((coord.cy * self.chunks_x + coord.cx) as usize)
        } else {
            None
        }
    }

    /// The chunk owning a cell coordinate.
    #[inline]
    pub fn chunk_of(&self, x: i32, y: i32) -> Option<ChunkCoord> {
        if x >= 0 && x < self.grid_width && y >= 0 && y < self.grid_height {
            Some(ChunkCoord::new(x / self.chunk_size, y / self.chunk_size))
        } else {
            None
        }
    }

    /// A chunk's own cell bounds, clamped to the grid.
    pub fn bounds(&self, coord: ChunkCoord) -> CellRect {
        let x0 = coord.cx * self.chunk_size;
        let y0 = coord.cy * self.chunk_size;
        CellRect {
            x0,
            y0,
            x1: (x0 + self.chunk_size).min(self.grid_width),
            y1: (y0 + self.chunk_size).min(self.grid_height),
        }
    }

    /// A chunk's processing window: its bounds expanded by the margin on
    /// every side, clamped to the grid. All of a chunk task's writes land
    /// inside this rectangle.
    pub fn window(&self, coord: ChunkCoord) -> CellRect {
        let m = self.margin();
        let x0 = coord.cx * self.chunk_size;
        let y0 = coord.cy * self.chunk_size;
        CellRect {
            x0: (x0 - m).max(0),
            y0: (y0 - m).max(0),
            x1: (x0 + self.chunk_size + m).min(self.grid_width),
            y1: (y0 + self.chunk_size + m).min(self.grid_height),
        }
    }

    /// Flag the chunk owning (x, y) as dirty. Every writer must call this
    /// whenever a cell's material or velocity actually changes; writes that
    /// skip it leave the chunk's activity stale and it will not simulate.
    #[inline]
    pub fn mark_dirty(&self, x: i32, y: i32) {
        if let Some(idx) = self.chunk_of(x, y).and_then(|c| self.index(c)) {
            self.dirty[idx].store(true, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn is_dirty(&self, coord: ChunkCoord) -> bool {
        self.index(coord)
            .map(|i| self.dirty[i].load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Pin a chunk as always-active (emitters, machines and other structures
    /// placed by gameplay code).
    pub fn set_structure(&mut self, coord: ChunkCoord, pinned: bool) {
        if let Some(i) = self.index(coord) {
            self.has_structure[i] = pinned;
        }
    }

    /// Whether a chunk will be simulated this step.
    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.dirty[i].load(Ordering::Relaxed)
                    || self.active_last_step[i]
                    || self.has_structure[i]
            }
            None => false,
        }
    }

    /// The active chunks of one scheduling group, in deterministic row-major
    /// order. Inactive chunks are skipped entirely, so an idle grid costs
    /// near nothing to step.
    pub fn active_chunks(&self, group: ChunkGroup) -> Vec<ChunkCoord> {
        let mut out = Vec::new();
        for cy in 0..self.chunks_y {
            for cx in 0..self.chunks_x {
                let coord = ChunkCoord::new(cx, cy);
                if coord.group() == group && self.is_active(coord) {
                    out.push(coord);
                }
            }
        }
        out
    }

    /// Roll activity over for the next step: `active_last_step` takes this
    /// step's dirty flags, then dirty is cleared. The one-step cool-down lets
    /// a chunk settle before going fully inactive, avoiding flicker from
    /// borderline reactivation.
    pub fn advance_activity(&mut self) {
        for (i, flag) in self.dirty.iter_mut().enumerate() {
            self.active_last_step[i] = flag.swap(false, Ordering::Relaxed);
        }
    }

    /// Number of chunks that would simulate this step (observability).
    pub fn active_chunk_count(&self) -> usize {
        let mut count = 0;
        for cy in 0..self.chunks_y {
            for cx in 0..self.chunks_x {
                if self.is_active(ChunkCoord::new(cx, cy)) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Per-chunk activity flags in row-major order (observability).
    pub fn activity_plane(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(self.dirty.len());
        for cy in 0..self.chunks_y {
            for cx in 0..self.chunks_x {
                out.push(self.is_active(ChunkCoord::new(cx, cy)));
            }
        }
        out
    }

    /// Mark every chunk containing a non-empty cell dirty. Used when seeding
    /// a freshly built world so the first step simulates its contents.
    pub fn mark_occupied(&self, cells: &[crate::grid::Cell], width: i32) {
        for (i, cell) in cells.iter().enumerate() {
            if !cell.is_empty() {
                self.mark_dirty((i as i32) % width, (i as i32) / width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_assignment() {
        assert_eq!(ChunkCoord::new(0, 0).group(), ChunkGroup::A);
        assert_eq!(ChunkCoord::new(1, 0).group(), ChunkGroup::B);
        assert_eq!(ChunkCoord::new(0, 1).group(), ChunkGroup::C);
        assert_eq!(ChunkCoord::new(1, 1).group(), ChunkGroup::D);
        assert_eq!(ChunkCoord::new(2, 2).group(), ChunkGroup::A);
    }

    #[test]
    fn test_partition_invariant_same_group_spacing() {
        // Any two same-group chunks sit at least two chunk-widths apart on
        // both axes, for a range of grid and chunk sizes.
        for &(w, h, s) in &[(256, 256, 64), (300, 180, 64), (1024, 512, 128)] {
            let map = ChunkMap::new(w, h, s);
            let mut coords = Vec::new();
            for cy in 0..map.chunks_y() {
                for cx in 0..map.chunks_x() {
                    coords.push(ChunkCoord::new(cx, cy));
                }
            }
            for &a in &coords {
                for &b in &coords {
                    if a != b && a.group() == b.group() {
                        let dx = (a.cx - b.cx).abs() * s;
                        let dy = (a.cy - b.cy).abs() * s;
                        assert!(
                            dx >= 2 * s || dy >= 2 * s,
                            "chunks {:?} and {:?} too close for group sharing",
                            a,
                            b
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_group_windows_never_overlap() {
        let map = ChunkMap::new(512, 512, 64);
        let mut coords = Vec::new();
        for cy in 0..map.chunks_y() {
            for cx in 0..map.chunks_x() {
                coords.push(ChunkCoord::new(cx, cy));
            }
        }
        for &a in &coords {
            for &b in &coords {
                if a != b && a.group() == b.group() {
                    assert!(
                        !map.window(a).intersects(&map.window(b)),
                        "windows of {:?} and {:?} overlap",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn test_displacement_fits_margin() {
        let map = ChunkMap::new(256, 256, DEFAULT_CHUNK_SIZE);
        assert!(MAX_STEP_DISPLACEMENT < map.margin());
    }

    #[test]
    fn test_dirty_drives_activity_with_cooldown() {
        let mut map = ChunkMap::new(256, 256, 64);
        let coord = ChunkCoord::new(1, 1);
        assert!(!map.is_active(coord));

        map.mark_dirty(70, 70);
        assert!(map.is_active(coord));

        // First rollover: dirty becomes active_last_step (cool-down step).
        map.advance_activity();
        assert!(map.is_active(coord));

        // Second rollover with no new writes: chunk goes inactive.
        map.advance_activity();
        assert!(!map.is_active(coord));
    }

    #[test]
    fn test_structure_pins_chunk_active() {
        let mut map = ChunkMap::new(256, 256, 64);
        let coord = ChunkCoord::new(2, 0);
        map.set_structure(coord, true);
        assert!(map.is_active(coord));
        map.advance_activity();
        map.advance_activity();
        assert!(map.is_active(coord));
        map.set_structure(coord, false);
        assert!(!map.is_active(coord));
    }

    #[test]
    fn test_active_chunks_filters_by_group() {
        let map = ChunkMap::new(256, 256, 64);
        map.mark_dirty(0, 0); // chunk (0,0) - group A
        map.mark_dirty(65, 0); // chunk (1,0) - group B
        assert_eq!(map.active_chunks(ChunkGroup::A), vec![ChunkCoord::new(0, 0)]);
        assert_eq!(map.active_chunks(ChunkGroup::B), vec![ChunkCoord::new(1, 0)]);
        assert!(map.active_chunks(ChunkGroup::C).is_empty());
        assert_eq!(map.active_chunk_count(), 2);
    }

    #[test]
    fn test_out_of_bounds_marks_are_noops() {
        let map = ChunkMap::new(128, 128, 64);
        map.mark_dirty(-1, 0);
        map.mark_dirty(0, 128);
        assert_eq!(map.active_chunk_count(), 0);
    }

    #[test]
    fn test_window_clamps_to_grid() {
        let map = ChunkMap::new(256, 256, 64);
        let w = map.window(ChunkCoord::new(0, 0));
        assert_eq!(w, CellRect { x0: 0, y0: 0, x1: 96, y1: 96 });
        let inner = map.window(ChunkCoord::new(1, 1));
        assert_eq!(inner, CellRect { x0: 32, y0: 32, x1: 160, y1: 160 });
    }
}
