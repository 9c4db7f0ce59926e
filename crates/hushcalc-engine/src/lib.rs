//! Hushcalc — narrative engine.
//!
//! The domain layer holds the state machine proper: `EngineState`, the
//! intents it accepts, the effects it emits, and the small pure helpers
//! around it (gestures, arithmetic, suppression windows). The application
//! layer drives it in time: the scheduler, the typing animation,
//! persistence and the `Session` that ties everything to the ports.

pub mod application;
pub mod domain;
