use std::net::{IpAddr, Ipv4Addr};

use crate::game::constants::{arena, net};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the metrics endpoint binds to
    pub bind_address: IpAddr,
    /// Port for the Prometheus metrics endpoint
    pub metrics_port: u16,
    /// Arena width in world units
    pub arena_width: f32,
    /// Arena height in world units
    pub arena_height: f32,
    /// Number of gravity wells kept alive
    pub well_count: usize,
    /// Number of debris kept in play
    pub debris_count: usize,
    /// Fixed RNG seed (random per process if unset)
    pub world_seed: Option<u64>,
    /// Messages buffered per connection before frames are dropped
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            metrics_port: 9090,
            arena_width: arena::DEFAULT_WIDTH,
            arena_height: arena::DEFAULT_HEIGHT,
            well_count: arena::DEFAULT_WELL_COUNT,
            debris_count: arena::DEFAULT_DEBRIS_COUNT,
            world_seed: None,
            outbox_capacity: net::OUTBOX_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.metrics_port = parsed,
                Ok(_) => tracing::warn!("METRICS_PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid METRICS_PORT '{}', using default", port),
            }
        }

        if let Some(width) = positive_f32_var("ARENA_WIDTH") {
            config.arena_width = width;
        }

        if let Some(height) = positive_f32_var("ARENA_HEIGHT") {
            config.arena_height = height;
        }

        if let Ok(count) = std::env::var("WELL_COUNT") {
            match count.parse::<usize>() {
                Ok(parsed) if parsed <= 1000 => config.well_count = parsed,
                Ok(_) => tracing::warn!("WELL_COUNT must be 0-1000, using default"),
                Err(_) => tracing::warn!("Invalid WELL_COUNT '{}', using default", count),
            }
        }

        if let Ok(count) = std::env::var("DEBRIS_COUNT") {
            match count.parse::<usize>() {
                Ok(parsed) if parsed <= 10_000 => config.debris_count = parsed,
                Ok(_) => tracing::warn!("DEBRIS_COUNT must be 0-10000, using default"),
                Err(_) => tracing::warn!("Invalid DEBRIS_COUNT '{}', using default", count),
            }
        }

        if let Ok(seed) = std::env::var("WORLD_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.world_seed = Some(parsed);
            } else {
                tracing::warn!("Invalid WORLD_SEED '{}', using a random seed", seed);
            }
        }

        if let Ok(capacity) = std::env::var("OUTBOX_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) if parsed > 0 => config.outbox_capacity = parsed,
                Ok(_) => tracing::warn!("OUTBOX_CAPACITY must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid OUTBOX_CAPACITY '{}', using default", capacity),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.metrics_port == 0 {
            return Err("metrics_port cannot be 0".to_string());
        }
        if self.outbox_capacity == 0 {
            return Err("outbox_capacity must be at least 1".to_string());
        }
        // Every entity must fit between the walls with its placement buffer
        let min_side = 4.0 * arena::MIN_DISTANCE_BETWEEN;
        if self.arena_width < min_side || self.arena_height < min_side {
            return Err(format!("arena must be at least {min_side}x{min_side}"));
        }
        Ok(())
    }

    /// World construction parameters derived from this config
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            width: self.arena_width,
            height: self.arena_height,
            well_count: self.well_count,
            debris_count: self.debris_count,
            seed: self.world_seed,
        }
    }
}

fn positive_f32_var(name: &str) -> Option<f32> {
    let value = std::env::var(name).ok()?;
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && parsed > 0.0 => Some(parsed),
        _ => {
            tracing::warn!("Invalid {} '{}', using default", name, value);
            None
        }
    }
}

/// Parameters for building a [`crate::game::state::World`]
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub well_count: usize,
    pub debris_count: usize,
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        ServerConfig::default().world_config()
    }
}

impl WorldConfig {
    /// An arena with no wells or debris, for hand-built scenarios
    pub fn empty(width: f32, height: f32, seed: u64) -> Self {
        Self {
            width,
            height,
            well_count: 0,
            debris_count: 0,
            seed: Some(seed),
        }
    }
}
