//! Read-only world views for broadcast
//!
//! Snapshots own their data, so they can be serialised and sent after the
//! world lock is released.

use serde::{Deserialize, Serialize};

use crate::game::state::{Debris, GravityWell, Player, PlayerId, World};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellSnapshot {
    pub position: Vec2,
    pub radius: f32,
    pub gravity_radius: f32,
    /// Lethal (mature) wells are drawn differently
    pub is_alive: bool,
}

impl From<&GravityWell> for WellSnapshot {
    fn from(w: &GravityWell) -> Self {
        Self {
            position: w.body.position,
            radius: w.body.radius,
            gravity_radius: w.gravity_radius,
            is_alive: w.lethal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebrisSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub color: String,
}

impl From<&Debris> for DebrisSnapshot {
    fn from(d: &Debris) -> Self {
        Self {
            position: d.body.position,
            velocity: d.body.velocity,
            radius: d.body.radius,
            color: d.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub country: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub color: String,
    pub angle: f32,
    pub points: u32,
}

impl PlayerSnapshot {
    /// `None` for players still in the lobby
    pub fn from_player(p: &Player) -> Option<Self> {
        let name = p.name.clone()?;
        Some(Self {
            id: p.id,
            name,
            country: p.country.clone().unwrap_or_default(),
            position: p.body.position,
            velocity: p.body.velocity,
            radius: p.body.radius,
            color: p.color.clone(),
            angle: p.angle,
            points: p.points,
        })
    }
}

/// Everything a client needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub wells: Vec<WellSnapshot>,
    pub debris: Vec<DebrisSnapshot>,
    pub players: Vec<PlayerSnapshot>,
}

impl WorldSnapshot {
    pub fn from_world(world: &World) -> Self {
        let mut players: Vec<PlayerSnapshot> = world
            .players
            .values()
            .filter(|p| p.alive)
            .filter_map(PlayerSnapshot::from_player)
            .collect();
        players.sort_unstable_by_key(|p| p.id);

        Self {
            tick: world.tick,
            width: world.width,
            height: world.height,
            wells: world.wells.iter().map(WellSnapshot::from).collect(),
            debris: world.debris.iter().map(DebrisSnapshot::from).collect(),
            players,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }
}
