//! Hushcalc — mini-games.
//!
//! Four bounded sub-games temporarily take over the calculator's input:
//! whack-a-mole, keyboard chaos, the falling-letter word game and the
//! letter scramble. The `MiniGameSupervisor` guarantees that at most one is
//! active and reports a single `MiniGameOutcome` when it ends. Each game's
//! state is private to this crate; the narrative engine only sees the
//! outcome.

pub mod chaos;
pub mod oracle;
pub mod outcome;
pub mod scramble;
pub mod supervisor;
pub mod whack;
pub mod word;

pub use outcome::{GameStatus, MiniGameInput, MiniGameOutcome};
pub use supervisor::MiniGameSupervisor;
