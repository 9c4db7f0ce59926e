//! Shared test mocks and utilities for the hushcalc narrative calculator.

mod clock;
mod ports;
mod repository;
mod rng;

pub use clock::{FixedClock, ManualClock, test_epoch};
pub use ports::{RecordedCapability, RecordingCapabilities, RecordingPresenter};
pub use repository::{FailingKeyValueStore, InMemoryKeyValueStore};
pub use rng::{MockRng, SequenceRng};
