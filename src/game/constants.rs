/// Tick scheduling constants
pub mod physics {
    use std::time::Duration;

    /// Server tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Tick period, kept in nanoseconds so 60 Hz does not round down to 16ms
    pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);
}

/// Player body and movement constants
pub mod player {
    pub const RADIUS: f32 = 25.0;
    pub const MASS: f32 = 1.5;
    pub const RESTITUTION: f32 = 0.95;
    /// Magnitude of the thrust vector added per tick while "up" is held
    pub const ACCELERATION: f32 = 0.5;
    /// Applied as: velocity *= FRICTION
    pub const FRICTION: f32 = 0.97;
    pub const MAX_VELOCITY: f32 = 15.0;
    /// Heading change per tick while "left" or "right" is held
    pub const TURN_INCREMENT: f32 = 0.1;
    /// Headings wrap with this modulus
    pub const HEADING_MODULUS: f32 = 360.0;
    /// Initial heading (facing "up" the arena)
    pub const INITIAL_HEADING: f32 = std::f32::consts::PI;
    /// Velocity component multiplier on wall contact
    pub const WALL_BOUNCE_FACTOR: f32 = -1.5;
    /// Distance kept between a clamped player and the wall
    pub const WALL_CLEARANCE: f32 = 1.0;
    /// Ticks a player ignores further player collisions after one
    pub const COLLISION_COOLDOWN_TICKS: u32 = 15;
    /// Ticks a collision partner stays eligible for kill credit
    pub const SCORING_COOLDOWN_TICKS: u32 = 100;
    /// Gravity strength multiplier for players
    pub const GRAVITY_DAMPING: f32 = 0.075;
}

/// Debris body and movement constants
pub mod debris {
    pub const RADIUS: f32 = 15.0;
    pub const MASS: f32 = 1.0;
    pub const RESTITUTION: f32 = 1.0;
    /// Applied as: velocity *= FRICTION
    pub const FRICTION: f32 = 0.98;
    /// Ticks a debris ignores players (and other debris) after a hit
    pub const COOLDOWN_TICKS: u32 = 10;
    /// Gravity strength multiplier for debris
    pub const GRAVITY_DAMPING: f32 = 0.025;
    /// Colour of debris nobody has touched yet
    pub const DEFAULT_COLOR: &str = "white";
}

/// Gravity well lifecycle constants
pub mod well {
    use super::physics::TICK_RATE;

    pub const MIN_RADIUS: u32 = 15;
    pub const MAX_RADIUS: u32 = 45;
    /// Wells stop growing once their radius reaches this cap
    pub const RADIUS_CAP: f32 = MAX_RADIUS as f32 * 1.2;
    /// Radius added per tick until the cap
    pub const RADIUS_GROWTH: f32 = 0.02;
    /// Gravity radius grows this many times faster than the radius
    pub const GRAVITY_GROWTH_RATIO: f32 = 1.5;
    /// gravity_radius = radius * GRAVITY_RADIUS_FACTOR at creation
    pub const GRAVITY_RADIUS_FACTOR: f32 = 5.0;
    /// Lifespan bounds in ticks
    pub const MIN_LIFE: i32 = 25 * TICK_RATE as i32;
    pub const MAX_LIFE: i32 = 75 * TICK_RATE as i32;
    /// Ticks a new well spends attracting without being lethal
    pub const INFANCY_TICKS: i32 = 2 * TICK_RATE as i32;
}

/// Arena construction and placement constants
pub mod arena {
    pub const DEFAULT_WIDTH: f32 = 2800.0;
    pub const DEFAULT_HEIGHT: f32 = 2400.0;
    pub const DEFAULT_WELL_COUNT: usize = 10;
    pub const DEFAULT_DEBRIS_COUNT: usize = 30;
    /// Minimum clearance around a freshly placed entity
    pub const MIN_DISTANCE_BETWEEN: f32 = super::well::MAX_RADIUS as f32;
    /// Samples tried before placement gives up
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;
}

/// Scoring constants
pub mod scoring {
    /// Points for steering debris into a lethal well
    pub const POINTS_PER_DEBRIS: u32 = 100;
    /// Points for knocking a player into a lethal well
    pub const POINTS_PER_KILL: u32 = 500;
}

/// Player colour generation
pub mod color {
    /// Hex digits colours are drawn from (dark digits excluded)
    pub const LETTERS: [char; 13] = ['3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F'];
    /// Only the first 12 letters are ever drawn
    pub const USABLE_LETTERS: usize = 12;
    pub const DIGITS: usize = 6;
    /// Attempts at a colour no other player uses
    pub const MAX_ATTEMPTS: u32 = 5;
}

/// Browser key codes understood by the control handler
pub mod keys {
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
}

/// Networking constants
pub mod net {
    /// Messages buffered per connection before frames are dropped
    pub const OUTBOX_CAPACITY: usize = 64;
    /// Interval between periodic stats log lines, in seconds
    pub const STATS_LOG_INTERVAL_SECS: u64 = 30;
}
