//! Content-keyed auto-advance cues.
//!
//! Some lines move the story on by themselves no matter which step showed
//! them. The cue is looked up by the exact displayed text.

use serde::{Deserialize, Serialize};

use crate::step::StepId;

/// One auto-advance cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonologueCue {
    /// Exact text that triggers the cue.
    pub message: String,
    /// Delay after the text has finished typing.
    pub delay_ms: u64,
    /// Step to move to.
    pub next_step: StepId,
}

/// Lookup table of cues keyed by message text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonologueTable(Vec<MonologueCue>);

impl MonologueTable {
    /// Builds a table from cues.
    #[must_use]
    pub fn new(cues: Vec<MonologueCue>) -> Self {
        Self(cues)
    }

    /// The cue for `message`, if one exists.
    #[must_use]
    pub fn cue_for(&self, message: &str) -> Option<&MonologueCue> {
        self.0.iter().find(|cue| cue.message == message)
    }

    /// All cues.
    #[must_use]
    pub fn cues(&self) -> &[MonologueCue] {
        &self.0
    }
}
