//! The per-chunk physics kernel.
//!
//! Each active chunk is updated by one task per step, scanning its rows from
//! bottom to top (a row's final state is fixed before the row above tries to
//! move into it) with alternating scan direction per row to avoid systematic
//! drift. Three phases run per cell, skipped entirely for Empty and Solid:
//!
//! **Phase 1 (movement.rs)** - gravity accumulation, displacement and
//! collision, momentum transfer on swap, inertia on blocked falls, liquid
//! lateral flow.
//!
//! **Phase 2 (settle.rs)** - friction/damping of horizontal velocity, impact
//! splash for liquids that just landed.
//!
//! **Phase 3 (settle.rs)** - powder resting-angle slides and gas dispersion.
//!
//! ## Parallelism Notes
//! There is no cell-level synchronization anywhere in the kernel. A chunk
//! task reads and writes only inside its processing window; same-group
//! windows are disjoint by the partition invariant in `chunk`, and the
//! scheduler separates groups with a barrier. All randomness is drawn from a
//! per-chunk xorshift stream seeded by (step, chunk coords), so runs are
//! bit-identical regardless of worker count.

pub mod kernel;
pub mod movement;
pub mod settle;

pub use kernel::simulate_chunk;

use crate::chunk::ChunkCoord;

/// Fractional gravity added to the per-cell accumulator each step. When the
/// accumulator carries past one whole unit, vertical velocity gains a unit
/// and the remainder carries forward, so acceleration stays smooth despite
/// integer velocity storage.
pub const GRAVITY_RATE: u8 = 17;

/// Per-step velocity retention numerator/denominator (7/8 = 87.5%).
pub const FRICTION_NUM: i32 = 7;
pub const FRICTION_DEN: i32 = 8;

/// Fraction of momentum handed to a displaced cell on swap, and to the
/// horizontal neighbor when a fall is blocked (70%).
pub const MOMENTUM_NUM: i32 = 7;
pub const MOMENTUM_DEN: i32 = 10;

/// Magnitude of the lateral impulse a liquid gains on the step it lands.
pub const SPLASH_SPEED: i32 = 4;

/// Divisor converting a liquid's vertical impact speed into extra lateral
/// spread.
pub const LIQUID_SPREAD_DIV: i32 = 3;

/// Hard cap on per-step lateral dispersion, whatever the material table
/// says. Keeps the worst-case displacement below the chunk margin; see
/// `chunk::MAX_STEP_DISPLACEMENT`.
pub const MAX_DISPERSION: i32 = 8;

/// Random number generator (xorshift32).
#[inline]
fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Deterministic per-chunk random stream. Seeded from the step counter and
/// the chunk coordinates, so results do not depend on worker scheduling.
pub(crate) struct ChunkRng(u32);

impl ChunkRng {
    pub fn new(step: u64, coord: ChunkCoord) -> Self {
        let seed = (step as u32)
            .wrapping_mul(0x9E37_79B9)
            ^ (coord.cx as u32).wrapping_mul(0x85EB_CA6B)
            ^ (coord.cy as u32).wrapping_mul(0xC2B2_AE35);
        Self(if seed == 0 { 0x1234_5678 } else { seed })
    }

    #[inline]
    pub fn next(&mut self) -> u32 {
        xorshift32(&mut self.0)
    }

    /// Randomly signed unit, for splash direction and scan tie-breaking.
    #[inline]
    pub fn sign(&mut self) -> i32 {
        if self.next() & 1 == 1 {
            1
        } else {
            -1
        }
    }
}
