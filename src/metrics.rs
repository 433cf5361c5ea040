//! Prometheus-compatible metrics endpoint
//!
//! Exposes arena server metrics in Prometheus format.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::state::World;
use crate::game::systems::collision::CollisionReport;

const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the arena server
#[derive(Debug)]
pub struct Metrics {
    // Player counts
    pub connected_players: AtomicU64,
    pub spawned_players: AtomicU64,

    // Entity counts
    pub debris_count: AtomicU64,
    pub gravity_well_count: AtomicU64,
    pub lethal_well_count: AtomicU64,
    pub pending_respawns: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Gameplay counters
    pub deaths: AtomicU64,
    pub debris_consumed: AtomicU64,
    pub player_collisions: AtomicU64,

    // Network stats
    pub connections_active: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub messages_dropped: AtomicU64,
    pub bytes_sent: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connected_players: AtomicU64::new(0),
            spawned_players: AtomicU64::new(0),
            debris_count: AtomicU64::new(0),
            gravity_well_count: AtomicU64::new(0),
            lethal_well_count: AtomicU64::new(0),
            pending_respawns: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            debris_consumed: AtomicU64::new(0),
            player_collisions: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Accumulate what one collision pass did
    pub fn record_collisions(&self, report: &CollisionReport) {
        self.deaths.fetch_add(report.deaths as u64, Ordering::Relaxed);
        self.debris_consumed.fetch_add(report.debris_consumed as u64, Ordering::Relaxed);
        self.player_collisions.fetch_add(report.player_hits as u64, Ordering::Relaxed);
    }

    /// Refresh entity gauges from the world (call under the read lock)
    pub fn observe_world(&self, world: &World) {
        self.connected_players.store(world.player_count() as u64, Ordering::Relaxed);
        self.spawned_players.store(world.spawned_player_count() as u64, Ordering::Relaxed);
        self.debris_count.store(world.debris.len() as u64, Ordering::Relaxed);
        self.gravity_well_count.store(world.wells.len() as u64, Ordering::Relaxed);
        self.lethal_well_count
            .store(world.wells.iter().filter(|w| w.lethal).count() as u64, Ordering::Relaxed);
        self.pending_respawns.store(world.pending_respawns() as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Players
        metric!("bumper_arena_players_connected", "Connected players, spawned or not", "gauge",
            self.connected_players.load(Ordering::Relaxed));
        metric!("bumper_arena_players_spawned", "Players in the arena", "gauge",
            self.spawned_players.load(Ordering::Relaxed));

        // Entities
        metric!("bumper_arena_debris", "Debris in play", "gauge",
            self.debris_count.load(Ordering::Relaxed));
        metric!("bumper_arena_gravity_wells", "Gravity wells in play", "gauge",
            self.gravity_well_count.load(Ordering::Relaxed));
        metric!("bumper_arena_gravity_wells_lethal", "Mature gravity wells", "gauge",
            self.lethal_well_count.load(Ordering::Relaxed));
        metric!("bumper_arena_pending_respawns", "Entities waiting for free space", "gauge",
            self.pending_respawns.load(Ordering::Relaxed));

        // Performance
        metric!("bumper_arena_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("bumper_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("bumper_arena_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("bumper_arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("bumper_arena_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        // Gameplay
        metric!("bumper_arena_deaths_total", "Players lost to lethal wells", "counter",
            self.deaths.load(Ordering::Relaxed));
        metric!("bumper_arena_debris_consumed_total", "Debris swallowed by lethal wells", "counter",
            self.debris_consumed.load(Ordering::Relaxed));
        metric!("bumper_arena_player_collisions_total", "Resolved player collisions", "counter",
            self.player_collisions.load(Ordering::Relaxed));

        // Network
        metric!("bumper_arena_connections_active", "Open client connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("bumper_arena_messages_sent_total", "Total messages sent", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("bumper_arena_messages_received_total", "Total messages received", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("bumper_arena_messages_dropped_total", "Messages dropped on full outboxes", "counter",
            self.messages_dropped.load(Ordering::Relaxed));
        metric!("bumper_arena_bytes_sent_total", "Total bytes sent", "counter",
            self.bytes_sent.load(Ordering::Relaxed));
        metric!("bumper_arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON view of the same counters
    pub fn to_json(&self) -> String {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        serde_json::json!({
            "players": {
                "connected": load(&self.connected_players),
                "spawned": load(&self.spawned_players),
            },
            "entities": {
                "debris": load(&self.debris_count),
                "gravity_wells": load(&self.gravity_well_count),
                "lethal_wells": load(&self.lethal_well_count),
                "pending_respawns": load(&self.pending_respawns),
            },
            "performance": {
                "tick_time_us": load(&self.tick_time_us),
                "tick_time_p95_us": load(&self.tick_time_p95_us),
                "tick_time_p99_us": load(&self.tick_time_p99_us),
                "tick_time_max_us": load(&self.tick_time_max_us),
                "tick_count": load(&self.tick_count),
            },
            "gameplay": {
                "deaths": load(&self.deaths),
                "debris_consumed": load(&self.debris_consumed),
                "player_collisions": load(&self.player_collisions),
            },
            "network": {
                "connections": load(&self.connections_active),
                "messages_sent": load(&self.messages_sent),
                "messages_received": load(&self.messages_received),
                "messages_dropped": load(&self.messages_dropped),
                "bytes_sent": load(&self.bytes_sent),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, bind_address: IpAddr, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(bind_address, port);
    let listener = TcpListener::bind(addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics/json") {
                        http_response("application/json", &metrics.to_json())
                    } else if request.starts_with("GET /metrics") {
                        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
                    } else if request.starts_with("GET /health") {
                        http_response("text/plain", "OK")
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
