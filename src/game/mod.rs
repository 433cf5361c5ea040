pub mod body;
pub mod constants;
pub mod events;
pub mod shared;
pub mod snapshot;
pub mod state;
pub mod systems;
