//! Collision detection and response
//!
//! Runs once per tick after integration, in a fixed order:
//! player/player, player/debris, debris/debris, then wells against debris
//! and players.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::game::body::resolve_collision;
use crate::game::constants::{debris, player, scoring};
use crate::game::events::WorldEvent;
use crate::game::state::{PlayerId, World};
use crate::game::systems::{gravity, lifecycle};
use crate::util::vec2::Vec2;

/// What one collision pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollisionReport {
    pub player_hits: u32,
    pub debris_hits: u32,
    pub debris_bounces: u32,
    pub debris_consumed: u32,
    pub deaths: u32,
}

/// Run every collision phase for this tick
pub fn update(world: &mut World) -> CollisionReport {
    let mut report = CollisionReport::default();

    // Sorted so multi-body contacts resolve the same way every run
    let mut active: Vec<PlayerId> = world
        .players
        .values()
        .filter(|p| p.is_active())
        .map(|p| p.id)
        .collect();
    active.sort_unstable();

    player_collisions(world, &active, &mut report);
    player_debris_collisions(world, &active, &mut report);
    debris_collisions(world, &mut report);
    well_interactions(world, &active, &mut report);

    report
}

/// Bounce players off each other and record who hit whom
fn player_collisions(world: &mut World, active: &[PlayerId], report: &mut CollisionReport) {
    let mut seen: FxHashSet<(PlayerId, PlayerId)> = FxHashSet::default();

    for &a in active {
        for &b in active {
            if a == b {
                continue;
            }
            let pair = if a < b { (a, b) } else { (b, a) };
            if !seen.insert(pair) {
                continue;
            }

            let (Some(pa), Some(pb)) = (world.players.get(&a), world.players.get(&b)) else {
                continue;
            };
            if pa.collision_cooldown > 0 || pb.collision_cooldown > 0 {
                continue;
            }
            if !pa.body.overlaps(&pb.body) {
                continue;
            }

            // Bodies are Copy: resolve on copies, then write back
            let (mut body_a, mut body_b) = (pa.body, pb.body);
            if !resolve_collision(&mut body_a, &mut body_b) {
                continue;
            }

            for (id, other, body) in [(a, b, body_a), (b, a, body_b)] {
                if let Some(p) = world.players.get_mut(&id) {
                    p.body = body;
                    p.last_hit_by = Some(other);
                    p.collision_cooldown = player::COLLISION_COOLDOWN_TICKS;
                    p.scoring_cooldown = player::SCORING_COOLDOWN_TICKS;
                }
            }
            report.player_hits += 1;
        }
    }
}

/// Players knock debris around and claim it
fn player_debris_collisions(world: &mut World, active: &[PlayerId], report: &mut CollisionReport) {
    for id in active {
        let Some(p) = world.players.get_mut(id) else {
            continue;
        };

        for d in world.debris.iter_mut() {
            if d.player_cooldown > 0 || !p.body.overlaps(&d.body) {
                continue;
            }
            if !resolve_collision(&mut d.body, &mut p.body) {
                continue;
            }
            d.color.clone_from(&p.color);
            d.last_hit_by = Some(p.id);
            d.player_cooldown = debris::COOLDOWN_TICKS;
            report.debris_hits += 1;
        }
    }
}

/// Debris bounce off each other; ownership is untouched
fn debris_collisions(world: &mut World, report: &mut CollisionReport) {
    let len = world.debris.len();
    for i in 0..len {
        for j in (i + 1)..len {
            let (left, right) = world.debris.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];

            if a.debris_cooldown > 0 || b.debris_cooldown > 0 {
                continue;
            }
            if !a.body.overlaps(&b.body) {
                continue;
            }
            if !resolve_collision(&mut a.body, &mut b.body) {
                continue;
            }
            a.debris_cooldown = debris::COOLDOWN_TICKS;
            b.debris_cooldown = debris::COOLDOWN_TICKS;
            report.debris_bounces += 1;
        }
    }
}

/// Attract bodies in range, consume debris and kill players that touch a
/// lethal core, and pay out the points
fn well_interactions(world: &mut World, active: &[PlayerId], report: &mut CollisionReport) {
    let mut consumed: SmallVec<[usize; 8]> = SmallVec::new();
    let mut killed: SmallVec<[PlayerId; 4]> = SmallVec::new();

    for w in &world.wells {
        for (index, d) in world.debris.iter_mut().enumerate() {
            if consumed.contains(&index) {
                continue;
            }
            if gravity::within_lethal(w, &d.body) {
                consumed.push(index);
            } else if gravity::within_gravity(w, &d.body) {
                gravity::apply_gravity(w, &mut d.body, debris::GRAVITY_DAMPING);
            }
        }

        for id in active {
            if killed.contains(id) {
                continue;
            }
            let Some(p) = world.players.get_mut(id) else {
                continue;
            };
            if gravity::within_lethal(w, &p.body) {
                killed.push(*id);
            } else if gravity::within_gravity(w, &p.body) {
                gravity::apply_gravity(w, &mut p.body, player::GRAVITY_DAMPING);
            }
        }
    }

    consume_debris(world, consumed, report);
    kill_players(world, killed, report);
}

fn consume_debris(world: &mut World, mut consumed: SmallVec<[usize; 8]>, report: &mut CollisionReport) {
    if consumed.is_empty() {
        return;
    }

    // Highest index first so swap_remove never moves a pending index
    consumed.sort_unstable_by(|a, b| b.cmp(a));
    for &index in &consumed {
        let d = world.debris.swap_remove(index);
        world.award_points(d.last_hit_by, scoring::POINTS_PER_DEBRIS);
        debug!("Debris consumed, credited to {:?}", d.last_hit_by);
    }

    let count = consumed.len();
    world.stats.debris_consumed += count as u64;
    report.debris_consumed += count as u32;

    for _ in 0..count {
        lifecycle::respawn_debris(world);
    }
}

fn kill_players(world: &mut World, killed: SmallVec<[PlayerId; 4]>, report: &mut CollisionReport) {
    if killed.is_empty() {
        return;
    }

    // Credit every kill before reporting scores
    let mut attackers: SmallVec<[Option<PlayerId>; 4]> = SmallVec::new();
    for id in &killed {
        let Some(p) = world.players.get_mut(id) else {
            attackers.push(None);
            continue;
        };
        p.alive = false;
        p.body.velocity = Vec2::ZERO;
        attackers.push(p.last_hit_by.filter(|attacker| attacker != id));
    }
    for attacker in &attackers {
        world.award_points(*attacker, scoring::POINTS_PER_KILL);
    }

    for (id, attacker) in killed.iter().zip(&attackers) {
        let Some(p) = world.players.get(id) else {
            continue;
        };
        let name = p.name.clone().unwrap_or_default();
        info!("Player {} ({}) died with {} points, killer {:?}", name, id, p.points, attacker);
        let event = WorldEvent::Death {
            player_id: *id,
            name,
            score: p.points,
        };
        world.emit(event);
        world.stats.deaths += 1;
        report.deaths += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::game::body::Body;
    use crate::game::state::{Debris, GravityWell};
    use uuid::Uuid;

    fn empty_world() -> World {
        World::new(&WorldConfig::empty(2800.0, 2400.0, 17)).unwrap()
    }

    fn spawn_at(world: &mut World, position: Vec2, velocity: Vec2) -> PlayerId {
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();
        let p = world.get_player_mut(id).unwrap();
        p.name = Some(format!("player-{}", &id.to_string()[..4]));
        p.body.position = position;
        p.body.velocity = velocity;
        id
    }

    fn lethal_well(position: Vec2, radius: f32) -> GravityWell {
        let mut w = GravityWell::new(position, radius, 4000);
        w.lethal = true;
        w
    }

    #[test]
    fn test_players_bump_and_mark_each_other() {
        let mut world = empty_world();
        let a = spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(1.0, 1.0));
        let b = spawn_at(&mut world, Vec2::new(1001.0, 1000.0), Vec2::new(-1.0, -1.0));

        let report = update(&mut world);
        assert_eq!(report.player_hits, 1);

        let pa = world.get_player(a).unwrap();
        let pb = world.get_player(b).unwrap();
        assert_eq!(pa.last_hit_by, Some(b));
        assert_eq!(pb.last_hit_by, Some(a));
        assert_eq!(pa.scoring_cooldown, player::SCORING_COOLDOWN_TICKS);
        assert_eq!(pb.scoring_cooldown, player::SCORING_COOLDOWN_TICKS);
        assert_eq!(pa.collision_cooldown, player::COLLISION_COOLDOWN_TICKS);
        assert_eq!(pb.collision_cooldown, player::COLLISION_COOLDOWN_TICKS);

        // Line of centres is x: the x components swap, y is scaled by restitution
        let e = player::RESTITUTION;
        assert!(pa.velocity().approx_eq(Vec2::new(e - 2.0, e), 1e-4));
        assert!(pb.velocity().approx_eq(Vec2::new(2.0 - e, -e), 1e-4));
    }

    #[test]
    fn test_player_cooldown_suppresses_collision() {
        let mut world = empty_world();
        let a = spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(1.0, 0.0));
        let b = spawn_at(&mut world, Vec2::new(1010.0, 1000.0), Vec2::new(-1.0, 0.0));
        world.get_player_mut(b).unwrap().collision_cooldown = 1;

        let report = update(&mut world);

        assert_eq!(report.player_hits, 0);
        assert_eq!(world.get_player(a).unwrap().velocity(), Vec2::new(1.0, 0.0));
        assert!(world.get_player(a).unwrap().last_hit_by.is_none());
    }

    #[test]
    fn test_distant_players_do_not_collide() {
        let mut world = empty_world();
        spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::ZERO);
        spawn_at(&mut world, Vec2::new(1050.1, 1000.0), Vec2::ZERO);
        assert_eq!(update(&mut world).player_hits, 0);
    }

    #[test]
    fn test_players_touching_exactly_collide() {
        let mut world = empty_world();
        spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(1.0, 0.0));
        spawn_at(&mut world, Vec2::new(1050.0, 1000.0), Vec2::ZERO);
        assert_eq!(update(&mut world).player_hits, 1);
    }

    #[test]
    fn test_coincident_players_are_skipped() {
        let mut world = empty_world();
        let a = spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(1.0, 0.0));
        spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::ZERO);

        assert_eq!(update(&mut world).player_hits, 0);
        assert!(world.get_player(a).unwrap().body.is_finite());
    }

    #[test]
    fn test_unspawned_and_dead_players_are_ignored() {
        let mut world = empty_world();
        let a = spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(1.0, 0.0));
        let lobby = Uuid::new_v4();
        world.add_player(lobby).unwrap();
        world.get_player_mut(lobby).unwrap().body.position = Vec2::new(1010.0, 1000.0);
        let dead = spawn_at(&mut world, Vec2::new(990.0, 1000.0), Vec2::ZERO);
        world.get_player_mut(dead).unwrap().alive = false;

        assert_eq!(update(&mut world).player_hits, 0);
        assert!(world.get_player(a).unwrap().last_hit_by.is_none());
    }

    #[test]
    fn test_player_claims_debris() {
        let mut world = empty_world();
        let id = spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(2.0, 0.0));
        world.debris.push(Debris::new(Vec2::new(1030.0, 1000.0)));

        let report = update(&mut world);

        assert_eq!(report.debris_hits, 1);
        let d = &world.debris[0];
        assert_eq!(d.last_hit_by, Some(id));
        assert_eq!(d.color, world.get_player(id).unwrap().color);
        assert_eq!(d.player_cooldown, debris::COOLDOWN_TICKS);
        assert!(d.velocity().x > 0.0);
    }

    #[test]
    fn test_debris_cooldown_suppresses_player_hit() {
        let mut world = empty_world();
        spawn_at(&mut world, Vec2::new(1000.0, 1000.0), Vec2::new(2.0, 0.0));
        let mut d = Debris::new(Vec2::new(1030.0, 1000.0));
        d.player_cooldown = 4;
        world.debris.push(d);

        assert_eq!(update(&mut world).debris_hits, 0);
        assert!(world.debris[0].last_hit_by.is_none());
        assert_eq!(world.debris[0].color, debris::DEFAULT_COLOR);
    }

    #[test]
    fn test_debris_bounce_keeps_owner() {
        let mut world = empty_world();
        let owner = Uuid::new_v4();
        let mut a = Debris::new(Vec2::new(500.0, 500.0));
        a.body.velocity = Vec2::new(1.0, 0.0);
        a.last_hit_by = Some(owner);
        world.debris.push(a);
        world.debris.push(Debris::new(Vec2::new(520.0, 500.0)));

        let report = update(&mut world);

        assert_eq!(report.debris_bounces, 1);
        assert_eq!(world.debris[0].last_hit_by, Some(owner));
        assert!(world.debris[1].last_hit_by.is_none());
        assert!(world.debris[1].velocity().approx_eq(Vec2::new(1.0, 0.0), 1e-5));
        assert!(world.debris.iter().all(|d| d.debris_cooldown == debris::COOLDOWN_TICKS));
    }

    #[test]
    fn test_debris_needs_both_cooldowns_clear() {
        let mut world = empty_world();
        let mut a = Debris::new(Vec2::new(500.0, 500.0));
        a.body.velocity = Vec2::new(1.0, 0.0);
        world.debris.push(a);
        let mut b = Debris::new(Vec2::new(520.0, 500.0));
        b.debris_cooldown = 2;
        world.debris.push(b);

        assert_eq!(update(&mut world).debris_bounces, 0);
        assert_eq!(world.debris[0].velocity(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_lethal_well_consumes_debris_and_pays_owner() {
        let mut world = empty_world();
        let owner = spawn_at(&mut world, Vec2::new(200.0, 200.0), Vec2::ZERO);
        world.wells.push(lethal_well(Vec2::new(1400.0, 1200.0), 30.0));
        let mut d = Debris::new(Vec2::new(1410.0, 1200.0));
        d.last_hit_by = Some(owner);
        world.debris.push(d);
        let before = world.debris.len();

        let report = update(&mut world);

        assert_eq!(report.debris_consumed, 1);
        assert_eq!(world.get_player(owner).unwrap().points, scoring::POINTS_PER_DEBRIS);
        assert_eq!(world.debris.len(), before);
        assert_eq!(world.stats.debris_consumed, 1);

        // The replacement overlaps nothing
        let replacement = &world.debris[0];
        assert!(replacement.last_hit_by.is_none());
        for w in &world.wells {
            assert!(!gravity::within_gravity(w, &replacement.body));
        }
        for p in world.players.values() {
            assert!(!p.body.overlaps(&replacement.body));
        }
    }

    #[test]
    fn test_unowned_debris_scores_nothing() {
        let mut world = empty_world();
        let bystander = spawn_at(&mut world, Vec2::new(200.0, 200.0), Vec2::ZERO);
        world.wells.push(lethal_well(Vec2::new(1400.0, 1200.0), 30.0));
        world.debris.push(Debris::new(Vec2::new(1400.0, 1200.0)));

        assert_eq!(update(&mut world).debris_consumed, 1);
        assert_eq!(world.get_player(bystander).unwrap().points, 0);
    }

    #[test]
    fn test_infant_well_attracts_but_spares() {
        let mut world = empty_world();
        world.wells.push(GravityWell::new(Vec2::new(1400.0, 1200.0), 30.0, 4000));
        world.debris.push(Debris::new(Vec2::new(1410.0, 1200.0)));
        let id = spawn_at(&mut world, Vec2::new(1400.0, 1300.0), Vec2::ZERO);

        let report = update(&mut world);

        assert_eq!(report.debris_consumed, 0);
        assert_eq!(report.deaths, 0);
        assert!(world.debris[0].velocity().x < 0.0);
        assert!(world.get_player(id).unwrap().velocity().y < 0.0);
        assert!(world.get_player(id).unwrap().alive);
    }

    #[test]
    fn test_player_dies_in_lethal_well() {
        let mut world = empty_world();
        let events = world.events();
        events.drain();
        world.wells.push(lethal_well(Vec2::new(1400.0, 1200.0), 30.0));
        let victim = spawn_at(&mut world, Vec2::new(1440.0, 1200.0), Vec2::new(3.0, 0.0));
        let killer = spawn_at(&mut world, Vec2::new(300.0, 300.0), Vec2::ZERO);
        {
            let v = world.get_player_mut(victim).unwrap();
            v.points = 250;
            v.last_hit_by = Some(killer);
        }
        events.drain();

        let report = update(&mut world);

        assert_eq!(report.deaths, 1);
        let v = world.get_player(victim).unwrap();
        assert!(!v.alive);
        assert_eq!(v.velocity(), Vec2::ZERO);
        assert_eq!(world.get_player(killer).unwrap().points, scoring::POINTS_PER_KILL);

        let emitted = events.drain();
        assert_eq!(emitted.len(), 1);
        match &emitted[0] {
            WorldEvent::Death { player_id, score, .. } => {
                assert_eq!(*player_id, victim);
                assert_eq!(*score, 250);
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Dead players are not reported twice
        assert_eq!(update(&mut world).deaths, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_death_without_attacker_pays_nobody() {
        let mut world = empty_world();
        world.wells.push(lethal_well(Vec2::new(1400.0, 1200.0), 30.0));
        let victim = spawn_at(&mut world, Vec2::new(1400.0, 1220.0), Vec2::ZERO);
        let other = spawn_at(&mut world, Vec2::new(300.0, 300.0), Vec2::ZERO);

        assert_eq!(update(&mut world).deaths, 1);
        assert_eq!(world.get_player(other).unwrap().points, 0);
        assert_eq!(world.get_player(victim).unwrap().points, 0);
    }

    #[test]
    fn test_overlapping_wells_consume_once() {
        let mut world = empty_world();
        world.wells.push(lethal_well(Vec2::new(1400.0, 1200.0), 30.0));
        world.wells.push(lethal_well(Vec2::new(1420.0, 1200.0), 30.0));
        world.debris.push(Debris::new(Vec2::new(1410.0, 1200.0)));

        let report = update(&mut world);

        assert_eq!(report.debris_consumed, 1);
        assert_eq!(world.debris.len(), 1);
    }
}
