//! Phase 1 - displacement, collision, momentum transfer and liquid lateral
//! flow.

use crate::grid::{clamp_velocity, Cell};
use crate::material::BehaviorType;
use crate::physics::kernel::{ChunkWindow, Probe};
use crate::physics::{GRAVITY_RATE, MAX_DISPERSION, MOMENTUM_DEN, MOMENTUM_NUM};

/// Where a cell ended up after phase 1, plus what happened on the way.
pub(crate) struct MoveOutcome {
    pub x: i32,
    pub y: i32,
    /// The cell was falling and got stopped this step.
    pub landed: bool,
    /// Vertical speed at the moment the fall was stopped.
    pub impact: i8,
}

/// Material dispersion rate, capped so the displacement bound holds whatever
/// the material table says.
#[inline]
pub(crate) fn effective_dispersion(rate: u8) -> i32 {
    (rate as i32).min(MAX_DISPERSION)
}

pub(crate) fn apply(
    win: &mut ChunkWindow<'_>,
    x: i32,
    y: i32,
    mut cell: Cell,
    behavior: BehaviorType,
) -> MoveOutcome {
    let original = cell;
    let density = win.registry().density(cell.material);
    let dispersion = effective_dispersion(win.registry().lookup(cell.material).dispersion_rate);

    let mut cx = x;
    let mut cy = y;
    let mut moved = false;

    // Gravity accumulation. Only while the cell can actually fall (or is
    // already moving): a cell resting on a blocked neighbor accrues nothing,
    // so settled chunks stop changing and go to sleep.
    if matches!(behavior, BehaviorType::Powder | BehaviorType::Liquid) {
        let below_open = !matches!(win.probe(density, x, y + 1), Probe::Blocked);
        if below_open || cell.vy > 0 {
            let (acc, carry) = cell.gravity.overflowing_add(GRAVITY_RATE);
            cell.gravity = acc;
            if carry {
                cell.vy = clamp_velocity(cell.vy as i32 + 1);
            }
        }
    }

    let was_falling = cell.vy > 0;
    let mut blocked_fall = false;
    let mut impact = 0i8;
    // Slot the displaced cell rises into when a swap happens.
    let mut displaced: Option<(i32, i32, Cell)> = None;

    // Vertical displacement: advance up to vy cells, swapping at most once
    // with a strictly less dense movable target.
    for _ in 0..cell.vy.max(0) {
        match win.probe(density, cx, cy + 1) {
            Probe::Open => {
                cy += 1;
                moved = true;
            }
            Probe::Displace(mut other) => {
                let transfer = (cell.vy as i32 * MOMENTUM_NUM) / MOMENTUM_DEN;
                other.vy = clamp_velocity(other.vy as i32 + transfer);
                other.stamp = win.stamp;
                cell.vy = clamp_velocity(cell.vy as i32 - transfer);
                displaced = Some((cx, cy, other));
                cy += 1;
                moved = true;
                break;
            }
            Probe::Blocked => {
                blocked_fall = true;
                break;
            }
        }
    }

    if blocked_fall {
        impact = cell.vy;
        cell.vy = 0;
        // Inertia: the stopped fall pushes part of the horizontal momentum
        // into the neighbor it leans toward.
        if cell.vx != 0 {
            let dir = if cell.vx > 0 { 1 } else { -1 };
            if let Some(mut neighbor) = win.get(cx + dir, cy) {
                if win.registry().behavior(neighbor.material).is_movable() {
                    let transfer = (cell.vx as i32 * MOMENTUM_NUM) / MOMENTUM_DEN;
                    if transfer != 0 {
                        neighbor.vx = clamp_velocity(neighbor.vx as i32 + transfer);
                        win.put(cx + dir, cy, neighbor);
                        cell.vx = clamp_velocity(cell.vx as i32 - transfer);
                    }
                }
            }
        }
    }

    // Horizontal displacement from accumulated vx. Liquids cap the travel at
    // their dispersion rate and spend the whole impulse on the move, which
    // is what keeps their total spread bounded.
    if cell.vx != 0 {
        let dir = if cell.vx > 0 { 1 } else { -1 };
        let mut budget = (cell.vx as i32).abs();
        if behavior == BehaviorType::Liquid {
            budget = budget.min(dispersion);
        }
        let mut bumped = false;
        for _ in 0..budget {
            if win.is_open(cx + dir, cy) {
                cx += dir;
                moved = true;
            } else {
                bumped = true;
                break;
            }
        }
        if bumped || behavior == BehaviorType::Liquid {
            cell.vx = 0;
        }
    }

    // Liquid lateral flow: a liquid that cannot fall slides toward the
    // nearest column (within its dispersion rate) it could fall into. Only
    // columns it can actually drop from count, so puddles level out and then
    // stop instead of crawling forever.
    if behavior == BehaviorType::Liquid
        && !moved
        && matches!(win.probe(density, cx, cy + 1), Probe::Blocked)
    {
        let first = win.rng.sign();
        'search: for dir in [first, -first] {
            for d in 1..=dispersion {
                let tx = cx + dir * d;
                if !win.is_open(tx, cy) {
                    break;
                }
                if win.is_open(tx, cy + 1) {
                    cx = tx;
                    moved = true;
                    break 'search;
                }
            }
        }
    }

    if moved {
        cell.stamp = win.stamp;
    }
    if (cx, cy) != (x, y) {
        win.put(x, y, Cell::EMPTY);
        if let Some((sx, sy, other)) = displaced {
            win.put(sx, sy, other);
        }
        win.put(cx, cy, cell);
    } else if cell != original {
        win.put(x, y, cell);
    }

    MoveOutcome {
        x: cx,
        y: cy,
        landed: was_falling && blocked_fall,
        impact,
    }
}
