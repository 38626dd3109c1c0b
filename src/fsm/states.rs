//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  STOPPED ──[mode Up, top dry]──▶ RAISING ──[top contact]──▶ SEATING-UP
//!     ▲                               ▲                            │
//!     │                         [contact lost]            [up dwell elapsed]
//!     ├───────────────────────────────┴────────────────────────────┘
//!     │
//!     ├──[mode Down, bottom dry]──▶ LOWERING ──[bottom contact]──▶ SEATING-DOWN
//!     │                                                  [down dwell elapsed]
//!     └──────────────────────────────────────────────────────────────┘
//!
//!  Any state ──[fault]──▶ FAULTED ──[faults cleared]──▶ STOPPED
//!  Any travel state ──[mode Off]──▶ STOPPED (within one tick)
//! ```
//!
//! The seating dwells hold the relay past first sensor contact so the pod
//! seats fully against its mechanical stop; the up dwell is the longer of
//! the two.  A mode change cancels a dwell on the next tick.

use super::context::{LiftContext, LiftMode, LiftPosition, RelayCommands};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per pod at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Stopped
        StateDescriptor {
            id: StateId::Stopped,
            name: "Stopped",
            on_enter: Some(stopped_enter),
            on_exit: None,
            on_update: stopped_update,
        },
        // Index 1 — Raising
        StateDescriptor {
            id: StateId::Raising,
            name: "Raising",
            on_enter: Some(raising_enter),
            on_exit: None,
            on_update: raising_update,
        },
        // Index 2 — SeatingUp
        StateDescriptor {
            id: StateId::SeatingUp,
            name: "SeatingUp",
            on_enter: Some(seating_up_enter),
            on_exit: None,
            on_update: seating_up_update,
        },
        // Index 3 — Lowering
        StateDescriptor {
            id: StateId::Lowering,
            name: "Lowering",
            on_enter: Some(lowering_enter),
            on_exit: None,
            on_update: lowering_update,
        },
        // Index 4 — SeatingDown
        StateDescriptor {
            id: StateId::SeatingDown,
            name: "SeatingDown",
            on_enter: Some(seating_down_enter),
            on_exit: None,
            on_update: seating_down_update,
        },
        // Index 5 — Faulted
        StateDescriptor {
            id: StateId::Faulted,
            name: "Faulted",
            on_enter: Some(faulted_enter),
            on_exit: Some(faulted_exit),
            on_update: faulted_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPED — relays released, holding position
// ═══════════════════════════════════════════════════════════════════════════

fn stopped_enter(ctx: &mut LiftContext) {
    ctx.commands = RelayCommands::all_off();
}

fn stopped_update(ctx: &mut LiftContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    // At rest the sensors are the position truth.
    ctx.position = match (ctx.sensors.top_wet, ctx.sensors.bot_wet) {
        (true, false) => LiftPosition::Up,
        (false, true) => LiftPosition::Down,
        _ => LiftPosition::Middle,
    };

    match ctx.mode {
        LiftMode::Up if !ctx.sensors.top_wet => Some(StateId::Raising),
        LiftMode::Down if !ctx.sensors.bot_wet => Some(StateId::Lowering),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RAISING — up relay engaged, travelling toward the top sensor
// ═══════════════════════════════════════════════════════════════════════════

fn raising_enter(ctx: &mut LiftContext) {
    ctx.commands = RelayCommands::raising();
    ctx.position = if ctx.sensors.bot_wet {
        LiftPosition::AlmostDown
    } else {
        LiftPosition::Middle
    };
    info!("RAISING: relay engaged");
}

fn raising_update(ctx: &mut LiftContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    match ctx.mode {
        LiftMode::Off => return Some(StateId::Stopped),
        LiftMode::Down => return Some(StateId::Lowering),
        LiftMode::Up => {}
    }

    if ctx.sensors.top_wet {
        return Some(StateId::SeatingUp);
    }

    ctx.position = if ctx.sensors.bot_wet {
        LiftPosition::AlmostDown
    } else {
        LiftPosition::Middle
    };

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEATING-UP — top contact made, relay held for the up-settle dwell
// ═══════════════════════════════════════════════════════════════════════════

fn seating_up_enter(ctx: &mut LiftContext) {
    // Relay stays engaged from Raising.
    ctx.position = LiftPosition::AlmostUp;
    info!(
        "SEATING-UP: top contact, holding relay for {}ms",
        ctx.config.up_settle_ms
    );
}

fn seating_up_update(ctx: &mut LiftContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    match ctx.mode {
        LiftMode::Off => return Some(StateId::Stopped),
        LiftMode::Down => return Some(StateId::Lowering),
        LiftMode::Up => {}
    }

    // Contact bounced off before the dwell completed — keep driving.
    if !ctx.sensors.top_wet {
        return Some(StateId::Raising);
    }

    if ctx.ms_in_state() >= u64::from(ctx.config.up_settle_ms) {
        ctx.position = LiftPosition::Up;
        info!("SEATING-UP: seated");
        return Some(StateId::Stopped);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOWERING — down relay engaged, travelling toward the bottom sensor
// ═══════════════════════════════════════════════════════════════════════════

fn lowering_enter(ctx: &mut LiftContext) {
    ctx.commands = RelayCommands::lowering();
    ctx.position = if ctx.sensors.top_wet {
        LiftPosition::AlmostUp
    } else {
        LiftPosition::Middle
    };
    info!("LOWERING: relay engaged");
}

fn lowering_update(ctx: &mut LiftContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    match ctx.mode {
        LiftMode::Off => return Some(StateId::Stopped),
        LiftMode::Up => return Some(StateId::Raising),
        LiftMode::Down => {}
    }

    if ctx.sensors.bot_wet {
        return Some(StateId::SeatingDown);
    }

    ctx.position = if ctx.sensors.top_wet {
        LiftPosition::AlmostUp
    } else {
        LiftPosition::Middle
    };

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEATING-DOWN — bottom contact made, relay held for the down-settle dwell
// ═══════════════════════════════════════════════════════════════════════════

fn seating_down_enter(ctx: &mut LiftContext) {
    ctx.position = LiftPosition::AlmostDown;
    info!(
        "SEATING-DOWN: bottom contact, holding relay for {}ms",
        ctx.config.down_settle_ms
    );
}

fn seating_down_update(ctx: &mut LiftContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Faulted);
    }

    match ctx.mode {
        LiftMode::Off => return Some(StateId::Stopped),
        LiftMode::Up => return Some(StateId::Raising),
        LiftMode::Down => {}
    }

    if !ctx.sensors.bot_wet {
        return Some(StateId::Lowering);
    }

    if ctx.ms_in_state() >= u64::from(ctx.config.down_settle_ms) {
        ctx.position = LiftPosition::Down;
        info!("SEATING-DOWN: seated");
        return Some(StateId::Stopped);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULTED — relays forced off until every fault clears
// ═══════════════════════════════════════════════════════════════════════════

fn faulted_enter(ctx: &mut LiftContext) {
    ctx.commands = RelayCommands::all_off();
    // Neither sensor reading can be trusted here.
    ctx.position = LiftPosition::Middle;
    warn!(
        "FAULTED: relays released, fault_flags=0b{:08b}",
        ctx.fault_flags
    );
}

fn faulted_exit(_ctx: &mut LiftContext) {
    info!("FAULTED: faults cleared, resuming");
}

fn faulted_update(ctx: &mut LiftContext) -> Option<StateId> {
    if !ctx.has_faults() {
        return Some(StateId::Stopped);
    }
    None
}
