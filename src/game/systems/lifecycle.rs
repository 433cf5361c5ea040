//! Well aging and entity population upkeep
//!
//! Wells and debris keep a constant population: whatever expires or is
//! consumed is replaced. A replacement that cannot find free space is queued
//! and retried at the start of later ticks.

use tracing::{debug, warn};

use crate::game::state::World;

/// Retry queued respawns, then age every well and re-roll the expired ones
pub fn update(world: &mut World) {
    restore_population(world);

    for well in world.wells.iter_mut() {
        well.age();
    }

    let before = world.wells.len();
    world.wells.retain(|w| !w.is_expired());
    let expired = before - world.wells.len();

    if expired > 0 {
        debug!("{} gravity wells expired at tick {}", expired, world.tick);
        world.stats.wells_expired += expired as u64;
        for _ in 0..expired {
            respawn_well(world);
        }
    }
}

/// Place a replacement well, queueing it if the arena is full
pub fn respawn_well(world: &mut World) -> bool {
    match world.add_well() {
        Ok(()) => true,
        Err(e) => {
            warn!("Deferring well respawn: {}", e);
            world.pending_wells += 1;
            world.stats.placement_failures += 1;
            false
        }
    }
}

/// Place a replacement debris, queueing it if the arena is full
pub fn respawn_debris(world: &mut World) -> bool {
    match world.add_debris() {
        Ok(()) => true,
        Err(e) => {
            warn!("Deferring debris respawn: {}", e);
            world.pending_debris += 1;
            world.stats.placement_failures += 1;
            false
        }
    }
}

/// Retry queued respawns; each kind stops at its first failure
pub fn restore_population(world: &mut World) {
    while world.pending_wells > 0 {
        if world.add_well().is_err() {
            break;
        }
        world.pending_wells -= 1;
    }

    while world.pending_debris > 0 {
        if world.add_debris().is_err() {
            break;
        }
        world.pending_debris -= 1;
    }
}
