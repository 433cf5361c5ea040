use rayon::prelude::*;

use crate::game::body::PhysicalBody;
use crate::game::constants::{debris, player};
use crate::game::state::{Debris, Player, World};
use crate::util::vec2::Vec2;

/// Integrate every moving entity for one tick
/// Uses rayon for parallel iteration over debris and players
pub fn update(world: &mut World) {
    let (width, height) = (world.width, world.height);

    world
        .debris
        .par_iter_mut()
        .for_each(|d| update_debris(d, width, height));

    world
        .players
        .par_values_mut()
        .filter(|p| p.is_active())
        .for_each(|p| update_player(p, width, height));
}

/// Steering, thrust, friction, speed cap, integration, wall response and
/// cooldown decay for a single player
pub fn update_player(p: &mut Player, width: f32, height: f32) {
    if p.controls.left {
        p.angle = (p.angle + player::TURN_INCREMENT).rem_euclid(player::HEADING_MODULUS);
    }
    if p.controls.right {
        p.angle = (p.angle - player::TURN_INCREMENT).rem_euclid(player::HEADING_MODULUS);
    }

    let thrust = if p.controls.up {
        Vec2::from_heading(p.angle).normalize() * player::ACCELERATION
    } else {
        Vec2::ZERO
    };

    p.body.apply_factor(player::FRICTION);
    p.body.apply_vector(thrust);
    p.body.velocity = p.body.velocity.clamp_length(player::MAX_VELOCITY);
    p.body.apply_velocity();

    contain_player(&mut p.body, width, height);
    p.tick_cooldowns();
}

/// Push a player that crossed a wall back inside and kick it off the wall
fn contain_player(body: &mut PhysicalBody, width: f32, height: f32) {
    let r = body.radius;

    if body.position.x + r > width {
        body.position.x = width - r - player::WALL_CLEARANCE;
        body.velocity.x *= player::WALL_BOUNCE_FACTOR;
    } else if body.position.x - r < 0.0 {
        body.position.x = r + player::WALL_CLEARANCE;
        body.velocity.x *= player::WALL_BOUNCE_FACTOR;
    }

    if body.position.y + r > height {
        body.position.y = height - r - player::WALL_CLEARANCE;
        body.velocity.y *= player::WALL_BOUNCE_FACTOR;
    } else if body.position.y - r < 0.0 {
        body.position.y = r + player::WALL_CLEARANCE;
        body.velocity.y *= player::WALL_BOUNCE_FACTOR;
    }
}

/// Reflect off walls the next step would cross, then apply friction,
/// integrate and decay cooldowns
pub fn update_debris(d: &mut Debris, width: f32, height: f32) {
    let r = d.body.radius;
    let next = d.body.position + d.body.velocity;

    if next.x > width - r || next.x < r {
        d.body.velocity.x = -d.body.velocity.x;
    }
    if next.y > height - r || next.y < r {
        d.body.velocity.y = -d.body.velocity.y;
    }

    d.body.apply_factor(debris::FRICTION);
    d.body.apply_velocity();
    d.tick_cooldowns();
}
