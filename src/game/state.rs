//! Game state definitions and structures
//!
//! Contains all entities (players, debris, gravity wells) and the world that
//! owns them.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::WorldConfig;
use crate::game::body::{Body, PhysicalBody};
use crate::game::constants::{debris, keys, player, well};
use crate::game::events::{EventQueue, EventReceiver, WorldEvent};
use crate::game::snapshot::WorldSnapshot;
use crate::game::systems::{collision, lifecycle, physics, spawn};
use crate::util::vec2::Vec2;

/// Unique player identifier, assigned by the connection layer
pub type PlayerId = Uuid;

/// Errors surfaced to callers of world operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("Cannot generate unique random color")]
    ColorExhausted,
    #[error("No free space for an entity of radius {radius}")]
    NoFreeSpace { radius: f32 },
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("Player {0} already exists")]
    PlayerExists(PlayerId),
}

/// Steering keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
}

impl Key {
    /// Map a browser key code; unknown codes are ignored by callers
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            keys::LEFT => Some(Key::Left),
            keys::UP => Some(Key::Up),
            keys::RIGHT => Some(Key::Right),
            keys::DOWN => Some(Key::Down),
            _ => None,
        }
    }
}

/// Which keys a player is holding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
}

impl Controls {
    pub fn set(&mut self, key: Key, pressed: bool) {
        match key {
            Key::Left => self.left = pressed,
            Key::Up => self.up = pressed,
            Key::Right => self.right = pressed,
            Key::Down => self.down = pressed,
        }
    }
}

/// Player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    /// Set on spawn; `None` while the player is still in the lobby
    pub name: Option<String>,
    pub country: Option<String>,
    pub body: PhysicalBody,
    pub color: String,
    /// Heading, see [`Vec2::from_heading`]
    pub angle: f32,
    pub controls: Controls,
    pub points: u32,
    /// Last player bumped into, eligible for kill credit while
    /// `scoring_cooldown` runs
    pub last_hit_by: Option<PlayerId>,
    /// Ticks before another player collision is resolved
    pub collision_cooldown: u32,
    pub scoring_cooldown: u32,
    /// Cleared when the player falls into a lethal well
    pub alive: bool,
}

impl Player {
    /// A freshly connected player, not yet placed in the arena
    pub fn new(id: PlayerId, color: String) -> Self {
        Self {
            id,
            name: None,
            country: None,
            body: PhysicalBody::new(Vec2::ZERO, player::RADIUS, player::MASS, player::RESTITUTION),
            color,
            angle: player::INITIAL_HEADING,
            controls: Controls::default(),
            points: 0,
            last_hit_by: None,
            collision_cooldown: 0,
            scoring_cooldown: 0,
            alive: true,
        }
    }

    #[inline]
    pub fn is_spawned(&self) -> bool {
        self.name.is_some()
    }

    /// Spawned and not yet killed: takes part in the simulation
    #[inline]
    pub fn is_active(&self) -> bool {
        self.alive && self.is_spawned()
    }

    pub fn add_points(&mut self, points: u32) {
        self.points = self.points.saturating_add(points);
    }

    /// Count cooldowns down by one tick. Kill credit lapses once the scoring
    /// cooldown has run out.
    pub fn tick_cooldowns(&mut self) {
        self.collision_cooldown = self.collision_cooldown.saturating_sub(1);
        if self.scoring_cooldown > 0 {
            self.scoring_cooldown -= 1;
        } else {
            self.last_hit_by = None;
        }
    }
}

impl Body for Player {
    fn body(&self) -> &PhysicalBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicalBody {
        &mut self.body
    }
}

/// Debris players knock into wells for points
#[derive(Debug, Clone)]
pub struct Debris {
    pub body: PhysicalBody,
    /// Colour of the last player to strike it
    pub color: String,
    pub last_hit_by: Option<PlayerId>,
    /// Ticks before another player hit is resolved
    pub player_cooldown: u32,
    /// Ticks before another debris hit is resolved
    pub debris_cooldown: u32,
}

impl Debris {
    pub fn new(position: Vec2) -> Self {
        Self {
            body: PhysicalBody::new(position, debris::RADIUS, debris::MASS, debris::RESTITUTION),
            color: debris::DEFAULT_COLOR.to_string(),
            last_hit_by: None,
            player_cooldown: 0,
            debris_cooldown: 0,
        }
    }

    pub fn tick_cooldowns(&mut self) {
        self.player_cooldown = self.player_cooldown.saturating_sub(1);
        self.debris_cooldown = self.debris_cooldown.saturating_sub(1);
    }
}

impl Body for Debris {
    fn body(&self) -> &PhysicalBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicalBody {
        &mut self.body
    }
}

/// Lifecycle phase of a gravity well
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellPhase {
    /// Attracts but cannot kill
    Infant,
    /// Attracts, kills players and consumes debris
    Mature,
    /// Out of life, waiting to be re-rolled
    Expired,
}

/// A gravity well
#[derive(Debug, Clone)]
pub struct GravityWell {
    /// Position and lethal radius; wells never move
    pub body: PhysicalBody,
    /// Bodies inside this radius are pulled toward the well
    pub gravity_radius: f32,
    pub lethal: bool,
    /// Ticks left before the well expires
    pub remaining_life: i32,
    pub starting_life: i32,
}

impl GravityWell {
    pub fn new(position: Vec2, radius: f32, life: i32) -> Self {
        Self {
            body: PhysicalBody::new(position, radius, 0.0, 0.0),
            gravity_radius: radius * well::GRAVITY_RADIUS_FACTOR,
            lethal: false,
            remaining_life: life,
            starting_life: life,
        }
    }

    /// A well with a freshly rolled radius and lifespan
    pub fn random<R: Rng + ?Sized>(position: Vec2, rng: &mut R) -> Self {
        let radius = rng.gen_range(well::MIN_RADIUS..=well::MAX_RADIUS) as f32;
        let life = rng.gen_range(well::MIN_LIFE..=well::MAX_LIFE);
        Self::new(position, radius, life)
    }

    pub fn phase(&self) -> WellPhase {
        if self.is_expired() {
            WellPhase::Expired
        } else if self.lethal {
            WellPhase::Mature
        } else {
            WellPhase::Infant
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.remaining_life < 0
    }

    /// Advance one tick: lose a tick of life, mature once past infancy, and
    /// grow both radii until the radius reaches its cap.
    pub fn age(&mut self) {
        self.remaining_life -= 1;

        if self.remaining_life < self.starting_life - well::INFANCY_TICKS {
            self.lethal = true;
        }

        if self.body.radius < well::RADIUS_CAP {
            let grown = (self.body.radius + well::RADIUS_GROWTH).min(well::RADIUS_CAP);
            self.gravity_radius += (grown - self.body.radius) * well::GRAVITY_GROWTH_RATIO;
            self.body.radius = grown;
        }
    }
}

impl Body for GravityWell {
    fn body(&self) -> &PhysicalBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicalBody {
        &mut self.body
    }
}

/// Cumulative counters since world construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub deaths: u64,
    pub debris_consumed: u64,
    pub wells_expired: u64,
    pub placement_failures: u64,
}

/// The arena and everything in it
#[derive(Debug)]
pub struct World {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub wells: Vec<GravityWell>,
    pub debris: Vec<Debris>,
    pub players: HashMap<PlayerId, Player>,
    pub stats: WorldStats,
    /// Wells that could not be placed yet
    pub(crate) pending_wells: usize,
    /// Debris that could not be placed yet
    pub(crate) pending_debris: usize,
    pub(crate) rng: StdRng,
    events: EventQueue,
}

impl World {
    /// Build an arena and populate it with the configured wells and debris
    pub fn new(config: &WorldConfig) -> Result<Self, WorldError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut world = Self {
            tick: 0,
            width: config.width,
            height: config.height,
            wells: Vec::with_capacity(config.well_count),
            debris: Vec::with_capacity(config.debris_count),
            players: HashMap::new(),
            stats: WorldStats::default(),
            pending_wells: 0,
            pending_debris: 0,
            rng,
            events: EventQueue::new(),
        };

        for _ in 0..config.well_count {
            world.add_well()?;
        }
        for _ in 0..config.debris_count {
            world.add_debris()?;
        }

        info!(
            "World created: {}x{}, {} wells, {} debris",
            world.width,
            world.height,
            world.wells.len(),
            world.debris.len()
        );

        Ok(world)
    }

    /// Receiver for connect/death events
    pub fn events(&self) -> EventReceiver {
        self.events.receiver()
    }

    pub(crate) fn emit(&self, event: WorldEvent) {
        self.events.push(event);
    }

    /// Register a connection's player. It has no name or position until
    /// [`World::spawn_player`].
    pub fn add_player(&mut self, id: PlayerId) -> Result<(), WorldError> {
        if self.players.contains_key(&id) {
            return Err(WorldError::PlayerExists(id));
        }

        let color = spawn::generate_unique_color(self)?;
        debug!("Player {} joined with color {}", id, color);
        self.players.insert(id, Player::new(id, color));
        self.emit(WorldEvent::Connect { player_id: id });
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            debug!("Player {} removed", id);
        }
        removed
    }

    /// Name the player and drop it somewhere free in the arena
    pub fn spawn_player(&mut self, id: PlayerId, name: String, country: String) -> Result<(), WorldError> {
        if !self.players.contains_key(&id) {
            return Err(WorldError::PlayerNotFound(id));
        }

        let position = spawn::generate_position_excluding(self, player::RADIUS, Some(id))?;

        let player = self
            .players
            .get_mut(&id)
            .ok_or(WorldError::PlayerNotFound(id))?;
        player.body.position = position;
        player.body.velocity = Vec2::ZERO;
        player.name = Some(name);
        player.country = Some(country);
        player.alive = true;

        info!("Player {} spawned at ({:.0}, {:.0})", id, position.x, position.y);
        Ok(())
    }

    /// Press or release a steering key. Unknown key codes are ignored.
    pub fn set_player_control(&mut self, id: PlayerId, key_code: u32, pressed: bool) -> Result<(), WorldError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(WorldError::PlayerNotFound(id))?;

        if let Some(key) = Key::from_code(key_code) {
            player.controls.set(key, pressed);
        }
        Ok(())
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spawned_player_count(&self) -> usize {
        self.players.values().filter(|p| p.is_spawned()).count()
    }

    /// Credit points to a player if it is still connected
    pub fn award_points(&mut self, id: Option<PlayerId>, points: u32) -> bool {
        match id.and_then(|id| self.players.get_mut(&id)) {
            Some(player) => {
                player.add_points(points);
                true
            }
            None => false,
        }
    }

    /// Place one new debris at a free position
    pub fn add_debris(&mut self) -> Result<(), WorldError> {
        let position = spawn::generate_valid_position(self, debris::RADIUS)?;
        self.debris.push(Debris::new(position));
        Ok(())
    }

    /// Place one new gravity well at a free position
    pub fn add_well(&mut self) -> Result<(), WorldError> {
        let position = spawn::generate_valid_position(self, well::MIN_RADIUS as f32)?;
        let well = GravityWell::random(position, &mut self.rng);
        self.wells.push(well);
        Ok(())
    }

    /// Entities waiting for free space to be respawned
    pub fn pending_respawns(&self) -> usize {
        self.pending_wells + self.pending_debris
    }

    /// Run one simulation step: age wells, integrate, collide
    pub fn tick(&mut self) -> collision::CollisionReport {
        lifecycle::update(self);
        physics::update(self);
        let report = collision::update(self);
        self.assert_finite();
        self.tick += 1;
        report
    }

    /// Immutable copy of everything clients draw
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::from_world(self)
    }

    fn assert_finite(&self) {
        for player in self.players.values() {
            assert!(
                player.body.is_finite(),
                "player {} has a non-finite body after tick {}: {:?}",
                player.id,
                self.tick,
                player.body
            );
        }
        for debris in &self.debris {
            assert!(
                debris.body.is_finite(),
                "debris has a non-finite body after tick {}: {:?}",
                self.tick,
                debris.body
            );
        }
        for well in &self.wells {
            assert!(
                well.body.is_finite(),
                "well has a non-finite body after tick {}: {:?}",
                self.tick,
                well.body
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_world() -> World {
        World::new(&WorldConfig::empty(2800.0, 2400.0, 11)).unwrap()
    }

    #[test]
    fn test_new_world_population() {
        let config = WorldConfig {
            width: 2800.0,
            height: 2400.0,
            well_count: 20,
            debris_count: 30,
            seed: Some(1),
        };
        let world = World::new(&config).unwrap();
        assert_eq!(world.wells.len(), 20);
        assert_eq!(world.debris.len(), 30);
        assert_eq!(world.player_count(), 0);
        assert!(world.wells.iter().all(|w| !w.lethal));
    }

    #[test]
    fn test_new_world_fails_when_arena_is_too_crowded() {
        let config = WorldConfig {
            width: 200.0,
            height: 200.0,
            well_count: 0,
            debris_count: 50,
            seed: Some(1),
        };
        assert!(matches!(World::new(&config), Err(WorldError::NoFreeSpace { .. })));
    }

    #[test]
    fn test_add_player_is_unspawned() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();

        let player = world.get_player(id).unwrap();
        assert!(!player.is_spawned());
        assert!(!player.is_active());
        assert!(player.name.is_none());
        assert_eq!(player.color.len(), 7);
        assert!(player.color.starts_with('#'));
        assert_eq!(player.angle, player::INITIAL_HEADING);
    }

    #[test]
    fn test_add_player_emits_connect() {
        let mut world = empty_world();
        let events = world.events();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();

        assert_eq!(events.drain(), vec![WorldEvent::Connect { player_id: id }]);
    }

    #[test]
    fn test_add_player_twice_is_rejected() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();
        assert_eq!(world.add_player(id), Err(WorldError::PlayerExists(id)));
        assert_eq!(world.player_count(), 1);
    }

    #[test]
    fn test_spawn_player_places_inside_arena() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();
        world.spawn_player(id, "bumper".to_string(), "CA".to_string()).unwrap();

        let player = world.get_player(id).unwrap();
        assert!(player.is_active());
        assert_eq!(player.name.as_deref(), Some("bumper"));
        assert_eq!(player.country.as_deref(), Some("CA"));
        let p = player.position();
        assert!(p.x >= player::RADIUS && p.x <= world.width - player::RADIUS);
        assert!(p.y >= player::RADIUS && p.y <= world.height - player::RADIUS);
    }

    #[test]
    fn test_spawn_unknown_player() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        assert_eq!(
            world.spawn_player(id, "x".to_string(), String::new()),
            Err(WorldError::PlayerNotFound(id))
        );
    }

    #[test]
    fn test_set_player_control() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();

        world.set_player_control(id, keys::UP, true).unwrap();
        world.set_player_control(id, keys::LEFT, true).unwrap();
        world.set_player_control(id, keys::LEFT, false).unwrap();
        // Space bar: ignored
        world.set_player_control(id, 32, true).unwrap();

        let controls = world.get_player(id).unwrap().controls;
        assert!(controls.up);
        assert!(!controls.left);
        assert!(!controls.right);
        assert!(!controls.down);

        assert!(world.set_player_control(Uuid::new_v4(), keys::UP, true).is_err());
    }

    #[test]
    fn test_remove_player() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();
        assert!(world.remove_player(id).is_some());
        assert!(world.remove_player(id).is_none());
        assert_eq!(world.player_count(), 0);
    }

    #[test]
    fn test_player_cooldowns_floor_at_zero() {
        let mut player = Player::new(Uuid::new_v4(), "#333333".to_string());
        player.collision_cooldown = 2;
        player.scoring_cooldown = 1;
        player.last_hit_by = Some(Uuid::new_v4());

        player.tick_cooldowns();
        assert_eq!(player.collision_cooldown, 1);
        assert_eq!(player.scoring_cooldown, 0);
        assert!(player.last_hit_by.is_some());

        player.tick_cooldowns();
        assert_eq!(player.collision_cooldown, 0);
        assert_eq!(player.scoring_cooldown, 0);
        assert!(player.last_hit_by.is_none());

        player.tick_cooldowns();
        assert_eq!(player.collision_cooldown, 0);
        assert_eq!(player.scoring_cooldown, 0);
    }

    #[test]
    fn test_debris_cooldowns_are_independent() {
        let mut debris = Debris::new(Vec2::new(100.0, 100.0));
        debris.player_cooldown = 3;
        debris.debris_cooldown = 1;

        debris.tick_cooldowns();
        assert_eq!(debris.player_cooldown, 2);
        assert_eq!(debris.debris_cooldown, 0);

        debris.tick_cooldowns();
        assert_eq!(debris.player_cooldown, 1);
        assert_eq!(debris.debris_cooldown, 0);
    }

    #[test]
    fn test_random_well_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let w = GravityWell::random(Vec2::new(500.0, 500.0), &mut rng);
            assert!(w.radius() >= well::MIN_RADIUS as f32 && w.radius() <= well::MAX_RADIUS as f32);
            assert_eq!(w.radius().fract(), 0.0);
            assert!(w.starting_life >= well::MIN_LIFE && w.starting_life <= well::MAX_LIFE);
            assert_eq!(w.remaining_life, w.starting_life);
            assert_eq!(w.gravity_radius, w.radius() * well::GRAVITY_RADIUS_FACTOR);
            assert_eq!(w.phase(), WellPhase::Infant);
        }
    }

    #[test]
    fn test_well_becomes_lethal_on_exact_tick() {
        let mut w = GravityWell::new(Vec2::new(5.0, 10.0), 20.0, 200);
        let boundary = w.starting_life - well::INFANCY_TICKS - 1;

        while w.remaining_life > boundary + 1 {
            w.age();
            assert!(!w.lethal, "lethal early at remaining_life {}", w.remaining_life);
        }
        assert_eq!(w.remaining_life, boundary + 1);
        assert_eq!(w.phase(), WellPhase::Infant);

        w.age();
        assert_eq!(w.remaining_life, boundary);
        assert!(w.lethal);
        assert_eq!(w.phase(), WellPhase::Mature);
    }

    #[test]
    fn test_well_radius_grows_until_cap() {
        let mut w = GravityWell::new(Vec2::new(5.0, 10.0), 53.9, 10_000);
        let initial_gravity = w.gravity_radius;
        let mut previous_radius = w.radius();
        let mut previous_gravity = w.gravity_radius;

        for _ in 0..20 {
            w.age();
            let radius = w.radius();
            if previous_radius < well::RADIUS_CAP {
                assert!(radius > previous_radius);
                assert!(w.gravity_radius > previous_gravity);
            } else {
                assert_eq!(radius, previous_radius);
                assert_eq!(w.gravity_radius, previous_gravity);
            }
            assert!(radius <= well::RADIUS_CAP);
            previous_radius = radius;
            previous_gravity = w.gravity_radius;
        }
        assert_eq!(w.radius(), well::RADIUS_CAP);
        // 0.1 of radius growth, scaled by the gravity growth ratio
        assert!((w.gravity_radius - initial_gravity - 0.15).abs() < 1e-2);
    }

    #[test]
    fn test_well_growth_per_tick() {
        let mut w = GravityWell::new(Vec2::new(5.0, 10.0), 20.0, 200);
        w.gravity_radius = 5.0;
        for _ in 0..4 {
            w.age();
        }
        assert!((w.radius() - 20.08).abs() < 1e-4);
        assert!((w.gravity_radius - 5.12).abs() < 1e-4);
        assert_eq!(w.remaining_life, 196);
    }

    #[test]
    fn test_well_expiry() {
        let mut w = GravityWell::new(Vec2::new(5.0, 10.0), 20.0, 1);
        w.age();
        assert!(!w.is_expired());
        w.age();
        assert!(w.is_expired());
        assert_eq!(w.phase(), WellPhase::Expired);
    }

    #[test]
    fn test_award_points_ignores_missing_players() {
        let mut world = empty_world();
        let id = Uuid::new_v4();
        world.add_player(id).unwrap();

        assert!(world.award_points(Some(id), 100));
        assert!(!world.award_points(Some(Uuid::new_v4()), 100));
        assert!(!world.award_points(None, 100));
        assert_eq!(world.get_player(id).unwrap().points, 100);
    }

    #[test]
    fn test_tick_advances_counter() {
        let config = WorldConfig {
            well_count: 5,
            debris_count: 10,
            seed: Some(9),
            ..WorldConfig::default()
        };
        let mut world = World::new(&config).unwrap();
        for _ in 0..10 {
            world.tick();
        }
        assert_eq!(world.tick, 10);
        assert_eq!(world.debris.len() + world.pending_debris, 10);
        assert_eq!(world.wells.len() + world.pending_wells, 5);
    }
}
