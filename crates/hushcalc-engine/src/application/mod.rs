//! Time-driven orchestration around the narrative engine.

pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod typing;
