//! Outbound world events
//!
//! The world pushes events into a crossbeam channel it owns; the network side
//! holds cloned receivers and drains them after each tick.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::warn;

use crate::game::state::PlayerId;

/// Something the network layer must tell a specific connection about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    /// A player was registered; the connection should receive arena info
    Connect { player_id: PlayerId },
    /// A player touched a lethal well; the connection should be told and the
    /// player removed
    Death {
        player_id: PlayerId,
        name: String,
        score: u32,
    },
}

impl WorldEvent {
    pub fn player_id(&self) -> PlayerId {
        match self {
            WorldEvent::Connect { player_id } | WorldEvent::Death { player_id, .. } => *player_id,
        }
    }
}

/// Event queue owned by the world
#[derive(Debug)]
pub struct EventQueue {
    sender: Sender<WorldEvent>,
    receiver: Receiver<WorldEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, event: WorldEvent) {
        // The queue holds its own receiver, so the channel cannot be disconnected
        if let Err(e) = self.sender.send(event) {
            warn!("Dropped world event {:?}", e.into_inner());
        }
    }

    /// Receiver handle for the network layer
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable consumer side of the world event queue
///
/// Clones share one queue: each event is delivered to exactly one drainer.
#[derive(Debug, Clone)]
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Take every event queued so far, in emission order
    pub fn drain(&self) -> Vec<WorldEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
