//! Pure domain logic of the narrative calculator.

pub mod calculator;
pub mod effects;
pub mod engine;
pub mod gesture;
pub mod intents;
pub mod projection;
pub mod state;
pub mod timeout;
