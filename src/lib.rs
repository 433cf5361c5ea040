//! Bumper Arena Server Library
//!
//! World simulation for a multiplayer bumper arena: players steer circular
//! ships, knock debris into gravity wells for points and try to push each
//! other in. Transport and handshakes live outside this crate; connections
//! talk to a [`net::game_session::GameSession`] through typed messages.

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod util;
