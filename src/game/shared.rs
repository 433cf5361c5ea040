//! Thread-safe handle to the world
//!
//! One `RwLock` guards the whole world. Mutations and the full tick take the
//! write lock; snapshots take the read lock and return owned copies, so no
//! caller ever holds the lock while doing I/O.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::WorldConfig;
use crate::game::events::EventReceiver;
use crate::game::snapshot::WorldSnapshot;
use crate::game::state::{Player, PlayerId, World, WorldError};
use crate::game::systems::collision::CollisionReport;

#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
    events: EventReceiver,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        let events = world.events();
        Self {
            inner: Arc::new(RwLock::new(world)),
            events,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self, WorldError> {
        World::new(config).map(Self::new)
    }

    pub fn add_player(&self, id: PlayerId) -> Result<(), WorldError> {
        self.inner.write().add_player(id)
    }

    pub fn remove_player(&self, id: PlayerId) -> Option<Player> {
        self.inner.write().remove_player(id)
    }

    pub fn spawn_player(&self, id: PlayerId, name: String, country: String) -> Result<(), WorldError> {
        self.inner.write().spawn_player(id, name, country)
    }

    pub fn set_player_control(&self, id: PlayerId, key_code: u32, pressed: bool) -> Result<(), WorldError> {
        self.inner.write().set_player_control(id, key_code, pressed)
    }

    /// One full simulation step under a single write lock
    pub fn tick(&self) -> CollisionReport {
        self.inner.write().tick()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.inner.read().snapshot()
    }

    pub fn events(&self) -> EventReceiver {
        self.events.clone()
    }

    /// Arena dimensions, fixed for the life of the world
    pub fn dimensions(&self) -> (f32, f32) {
        let world = self.inner.read();
        (world.width, world.height)
    }

    /// Run `f` against the world under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` against the world under the write lock
    pub fn write<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.inner.write())
    }
}
