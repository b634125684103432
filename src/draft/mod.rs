// The draft subsystem: order generation, turn advancement, pick
// orchestration, status projection, and the timeout sweeper.

pub mod advance;
pub mod engine;
pub mod guard;
pub mod order;
pub mod status;
pub mod sweeper;
