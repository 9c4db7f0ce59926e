//! Hushcalc — step graph and story content.
//!
//! The conversation is a static graph of numbered steps. Every step is plain
//! data loaded from `story/steps.yaml`; the few steps with special behavior
//! (age branching, choice routing, mini-games, permission prompts) are tagged
//! rather than hard-coded.

pub mod graph;
pub mod monologue;
pub mod recovery;
pub mod step;

pub use graph::StepGraph;
pub use step::{StepConfig, StepId, TERMINAL};
