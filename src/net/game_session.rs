//! Game session - runs the game loop and delivers state to connections
//!
//! Each connection owns a bounded outbox. Frames are encoded once and pushed
//! with `try_send` after the world lock is released, so a slow client only
//! loses its own frames.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::constants::{net, physics};
use crate::game::events::{EventReceiver, WorldEvent};
use crate::game::shared::SharedWorld;
use crate::game::state::{PlayerId, WorldError};
use crate::game::systems::collision::CollisionReport;
use crate::metrics::Metrics;
use crate::net::protocol::{decode, encode, ClientMessage, ServerMessage};

/// An encoded message, shared between every outbox it is pushed to
pub type Frame = Arc<[u8]>;

/// Receives final scores when players die
pub trait ScoreRecorder: Send + Sync {
    fn record(&self, name: &str, score: u32);
}

/// Default recorder: writes scores to the log
#[derive(Debug, Default)]
pub struct LogScoreRecorder;

impl ScoreRecorder for LogScoreRecorder {
    fn record(&self, name: &str, score: u32) {
        info!("Final score: {} - {}", name, score);
    }
}

/// Connections plus the world they play in
pub struct GameSession {
    world: SharedWorld,
    events: EventReceiver,
    connections: RwLock<HashMap<PlayerId, mpsc::Sender<Frame>>>,
    metrics: Arc<Metrics>,
    scores: Box<dyn ScoreRecorder>,
    outbox_capacity: usize,
}

impl GameSession {
    pub fn new(world: SharedWorld, metrics: Arc<Metrics>, outbox_capacity: usize) -> Self {
        let events = world.events();
        Self {
            world,
            events,
            connections: RwLock::new(HashMap::new()),
            metrics,
            scores: Box::new(LogScoreRecorder),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    pub fn with_score_recorder(mut self, recorder: impl ScoreRecorder + 'static) -> Self {
        self.scores = Box::new(recorder);
        self
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Register a new connection. Returns its player id and the receiving
    /// end of its outbox.
    pub fn connect(&self) -> Result<(PlayerId, mpsc::Receiver<Frame>), WorldError> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.outbox_capacity);

        // Outbox first: the connect event is delivered through it
        self.connections.write().insert(id, tx);
        if let Err(e) = self.world.add_player(id) {
            self.connections.write().remove(&id);
            warn!("Rejected connection {}: {}", id, e);
            return Err(e);
        }

        self.metrics.connections_active.fetch_add(1, Ordering::Relaxed);
        info!("Connection {} opened", id);
        Ok((id, rx))
    }

    pub fn disconnect(&self, id: PlayerId) {
        if self.connections.write().remove(&id).is_some() {
            self.metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
        }
        self.world.remove_player(id);
        info!("Connection {} closed", id);
    }

    /// Apply a decoded client message to the world
    pub fn handle_message(&self, id: PlayerId, message: ClientMessage) -> Result<(), WorldError> {
        if !self.connections.read().contains_key(&id) {
            return Err(WorldError::PlayerNotFound(id));
        }

        match message {
            ClientMessage::Spawn { name, country } => self.world.write(|world| {
                // Players removed after a death rejoin on their next spawn
                if world.get_player(id).is_none() {
                    world.add_player(id)?;
                }
                world.spawn_player(id, name, country)
            }),
            ClientMessage::KeyHandler { key, is_pressed } => self.world.set_player_control(id, key, is_pressed),
        }
    }

    /// Decode and apply raw client bytes; bad input is logged and dropped
    pub fn handle_raw(&self, id: PlayerId, data: &[u8]) {
        self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);

        match decode::<ClientMessage>(data) {
            Ok(message) => {
                if let Err(e) = self.handle_message(id, message) {
                    warn!("Message from {} rejected: {}", id, e);
                }
            }
            Err(e) => warn!("Dropping undecodable message from {}: {}", id, e),
        }
    }

    /// Advance the world one tick and refresh metrics
    pub fn tick(&self) -> CollisionReport {
        let start = Instant::now();
        let report = self.world.tick();
        self.metrics.record_tick_time(start.elapsed());
        self.metrics.record_collisions(&report);
        self.world.read(|world| self.metrics.observe_world(world));
        report
    }

    /// Forward queued world events to their connections. Returns how many
    /// events were handled.
    pub fn process_events(&self) -> usize {
        let events = self.events.drain();
        let handled = events.len();

        for event in events {
            match event {
                WorldEvent::Connect { player_id } => {
                    let (arena_width, arena_height) = self.world.dimensions();
                    let message = ServerMessage::Initial {
                        arena_width,
                        arena_height,
                        player_id,
                    };
                    self.send_to(player_id, &message);
                }
                WorldEvent::Death { player_id, name, score } => {
                    self.scores.record(&name, score);

                    // A spawn handled between the kill and this drain has already
                    // started a new life; leave that one alone
                    let still_dead = self.world.write(|world| {
                        let dead = world.get_player(player_id).is_some_and(|p| !p.alive);
                        if dead {
                            world.remove_player(player_id);
                        }
                        dead
                    });

                    if still_dead {
                        self.send_to(player_id, &ServerMessage::Death);
                    } else {
                        debug!("Player {} respawned before death was delivered", player_id);
                    }
                }
            }
        }

        handled
    }

    /// Send the current snapshot to every connection. Returns how many
    /// outboxes accepted it.
    pub fn broadcast_snapshot(&self) -> usize {
        let snapshot = self.world.snapshot();
        let frame = match encode(&ServerMessage::Update(snapshot)) {
            Ok(bytes) => Frame::from(bytes),
            Err(e) => {
                warn!("Failed to encode snapshot: {}", e);
                return 0;
            }
        };

        let outboxes: Vec<(PlayerId, mpsc::Sender<Frame>)> = self
            .connections
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in &outboxes {
            if self.deliver(*id, tx, frame.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn send_to(&self, id: PlayerId, message: &ServerMessage) -> bool {
        let Some(tx) = self.connections.read().get(&id).cloned() else {
            debug!("No connection for {}", id);
            return false;
        };

        match encode(message) {
            Ok(bytes) => self.deliver(id, &tx, Frame::from(bytes)),
            Err(e) => {
                warn!("Failed to encode message for {}: {}", id, e);
                false
            }
        }
    }

    fn deliver(&self, id: PlayerId, tx: &mpsc::Sender<Frame>, frame: Frame) -> bool {
        let len = frame.len() as u64;
        match tx.try_send(frame) {
            Ok(()) => {
                self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
                self.metrics.bytes_sent.fetch_add(len, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.messages_dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Outbox full for {}, frame dropped", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbox closed for {}", id);
                false
            }
        }
    }
}

/// Start the game loop background task
pub fn start_game_loop(session: Arc<GameSession>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(physics::TICK_DURATION);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("Game loop started at {} Hz", physics::TICK_RATE);
        let start = Instant::now();
        let stats_every = physics::TICK_RATE as u64 * net::STATS_LOG_INTERVAL_SECS;
        let mut tick_count: u64 = 0;

        loop {
            ticker.tick().await;
            tick_count += 1;

            session.tick();
            session.process_events();
            session.broadcast_snapshot();

            if tick_count % stats_every == 0 {
                let (players, spawned, debris, wells, pending) = session.world().read(|w| {
                    (
                        w.player_count(),
                        w.spawned_player_count(),
                        w.debris.len(),
                        w.wells.len(),
                        w.pending_respawns(),
                    )
                });
                info!(
                    "Game: {}s, tick {}, {} connections, {} players ({} spawned), {} debris, {} wells, {} pending | p95 {}us",
                    start.elapsed().as_secs(),
                    tick_count,
                    session.connection_count(),
                    players,
                    spawned,
                    debris,
                    wells,
                    pending,
                    session.metrics.tick_time_p95_us.load(Ordering::Relaxed)
                );
            }
        }
    })
}
