//! Hushcalc Core — shared abstractions.
//!
//! This crate defines the traits and small value types every other crate
//! depends on: time, randomness, errors, the persisted key space and the
//! ports towards the presentation layer and the operating system. It contains
//! no infrastructure code.

pub mod clock;
pub mod error;
pub mod ports;
pub mod repository;
pub mod rng;
