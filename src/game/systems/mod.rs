pub mod collision;
pub mod gravity;
pub mod lifecycle;
pub mod physics;
pub mod spawn;
