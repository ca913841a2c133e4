//! Phases 2 and 3 - friction/damping, liquid splash, powder resting-angle
//! slides and gas dispersion.

use crate::grid::{clamp_velocity, Cell};
use crate::material::BehaviorType;
use crate::physics::kernel::{ChunkWindow, Probe};
use crate::physics::movement::{effective_dispersion, MoveOutcome};
use crate::physics::{FRICTION_DEN, FRICTION_NUM, LIQUID_SPREAD_DIV, SPLASH_SPEED};

/// Phase 2: damp horizontal velocity and apply impact splash to liquids that
/// just landed.
///
/// Vertical velocity is deliberately left alone: falls are stopped by
/// collisions (phase 1), not by drag, so free-fall timing stays derivable
/// from the gravity accumulation rate.
pub(crate) fn friction(win: &mut ChunkWindow<'_>, outcome: &MoveOutcome) {
    let Some(mut cell) = win.get(outcome.x, outcome.y) else {
        return;
    };
    if cell.is_empty() {
        return;
    }
    let behavior = win.registry().behavior(cell.material);
    if behavior.is_static() {
        return;
    }

    cell.vx = ((cell.vx as i32 * FRICTION_NUM) / FRICTION_DEN) as i8;

    if behavior == BehaviorType::Liquid && outcome.landed {
        // Impact converts into a lateral impulse: a fixed splash kick plus a
        // share of the vertical speed, clamped to the dispersion rate. The
        // sign is random; phase 1 spends the impulse next step.
        let dispersion = effective_dispersion(win.registry().lookup(cell.material).dispersion_rate);
        let extra = outcome.impact as i32 / LIQUID_SPREAD_DIV;
        let impulse = (SPLASH_SPEED + extra).min(dispersion);
        cell.vx = clamp_velocity(win.rng.sign() * impulse);
    }

    win.put(outcome.x, outcome.y, cell);
}

/// Phase 3: resting-angle slides for powders, dispersion for gases.
pub(crate) fn rest(win: &mut ChunkWindow<'_>, x: i32, y: i32, behavior: BehaviorType) {
    match behavior {
        BehaviorType::Powder => powder_slide(win, x, y),
        BehaviorType::Gas => gas_disperse(win, x, y),
        _ => {}
    }
}

/// A supported powder slides one step diagonally when a neighbor column
/// drops away by more than its slide resistance (angle-of-repose
/// approximation).
fn powder_slide(win: &mut ChunkWindow<'_>, x: i32, y: i32) {
    let Some(mut cell) = win.get(x, y) else {
        return;
    };
    let density = win.registry().density(cell.material);
    if !matches!(win.probe(density, x, y + 1), Probe::Blocked) {
        return; // still falling, phase 1 owns it
    }
    let resistance = win.registry().lookup(cell.material).slide_resistance as i32;

    let first = win.rng.sign();
    for dir in [first, -first] {
        let sx = x + dir;
        if !win.is_open(sx, y) {
            continue;
        }
        // Depth of the drop in the neighbor column, capped at one past the
        // resistance threshold.
        let mut drop = 0;
        while drop <= resistance && win.is_open(sx, y + 1 + drop) {
            drop += 1;
        }
        if drop > resistance {
            cell.stamp = win.stamp;
            win.put(x, y, Cell::EMPTY);
            win.put(sx, y + 1, cell);
            return;
        }
    }
}

/// A gas seeks empty space, upward rays before lateral ones (buoyancy),
/// walking as far as its spread distance along the first open ray. Lateral
/// drift is only taken when the destination column lets it keep rising, so
/// gas pooled under a ceiling comes to rest. A gas enclosed on all sides has
/// no open ray and stays put.
fn gas_disperse(win: &mut ChunkWindow<'_>, x: i32, y: i32) {
    let Some(mut cell) = win.get(x, y) else {
        return;
    };
    let spread = effective_dispersion(win.registry().lookup(cell.material).dispersion_rate);
    if spread == 0 {
        return;
    }

    let s = win.rng.sign();
    let rays = [(0, -1), (s, -1), (-s, -1), (s, 0), (-s, 0)];
    for (dx, dy) in rays {
        if !win.is_open(x + dx, y + dy) {
            continue;
        }
        let mut d = 1;
        while d < spread && win.is_open(x + dx * (d + 1), y + dy * (d + 1)) {
            d += 1;
        }
        let (tx, ty) = (x + dx * d, y + dy * d);
        if dy == 0 && !win.is_open(tx, ty - 1) {
            continue; // lateral drift that leads nowhere upward
        }
        cell.stamp = win.stamp;
        win.put(x, y, Cell::EMPTY);
        win.put(tx, ty, cell);
        return;
    }
}
