//! Entity placement and player colours

use rand::Rng;
use tracing::warn;

use crate::game::body::circles_colliding;
use crate::game::constants::{arena, color};
use crate::game::state::{PlayerId, World, WorldError};
use crate::util::vec2::Vec2;

/// Sample a position where a new entity of `object_radius` overlaps nothing
pub fn generate_valid_position(world: &mut World, object_radius: f32) -> Result<Vec2, WorldError> {
    generate_position_excluding(world, object_radius, None)
}

/// Like [`generate_valid_position`], ignoring one player (used when that
/// player is the one being placed)
pub fn generate_position_excluding(
    world: &mut World,
    object_radius: f32,
    exclude: Option<PlayerId>,
) -> Result<Vec2, WorldError> {
    let clearance = object_radius.max(arena::MIN_DISTANCE_BETWEEN);
    let max_x = world.width - object_radius;
    let max_y = world.height - object_radius;

    if max_x < object_radius || max_y < object_radius {
        return Err(WorldError::NoFreeSpace { radius: object_radius });
    }

    for _ in 0..arena::MAX_PLACEMENT_ATTEMPTS {
        let candidate = Vec2::new(
            world.rng.gen_range(object_radius..=max_x),
            world.rng.gen_range(object_radius..=max_y),
        );
        if is_position_valid(world, candidate, clearance, exclude) {
            return Ok(candidate);
        }
    }

    warn!(
        "No free position for radius {} after {} attempts",
        object_radius,
        arena::MAX_PLACEMENT_ATTEMPTS
    );
    Err(WorldError::NoFreeSpace { radius: object_radius })
}

/// A circle of `clearance` at `position` overlaps no well's gravity radius,
/// no debris and no spawned player
pub fn is_position_valid(world: &World, position: Vec2, clearance: f32, exclude: Option<PlayerId>) -> bool {
    let clear_of_wells = world
        .wells
        .iter()
        .all(|w| !circles_colliding(w.body.position, w.gravity_radius, position, clearance));

    let clear_of_debris = world
        .debris
        .iter()
        .all(|d| !circles_colliding(d.body.position, d.body.radius, position, clearance));

    let clear_of_players = world
        .players
        .values()
        .filter(|p| p.is_spawned() && Some(p.id) != exclude)
        .all(|p| !circles_colliding(p.body.position, p.body.radius, position, clearance));

    clear_of_wells && clear_of_debris && clear_of_players
}

/// A `#RRGGBB` colour no connected player already has
pub fn generate_unique_color(world: &mut World) -> Result<String, WorldError> {
    for _ in 0..color::MAX_ATTEMPTS {
        let candidate = random_color(&mut world.rng);
        if !world.players.values().any(|p| p.color == candidate) {
            return Ok(candidate);
        }
    }
    Err(WorldError::ColorExhausted)
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut out = String::with_capacity(1 + color::DIGITS);
    out.push('#');
    for _ in 0..color::DIGITS {
        out.push(color::LETTERS[rng.gen_range(0..color::USABLE_LETTERS)]);
    }
    out
}
