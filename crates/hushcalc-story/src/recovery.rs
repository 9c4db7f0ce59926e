//! Crash-safe resumption.
//!
//! A killed process must never come back on a step that was mid-animation or
//! waiting on a timer that no longer exists. On load the saved step is mapped
//! onto the nearest "safe" step, one that correctly waits for user input.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::step::StepId;

/// A range of steps that resumes at a fixed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCollapse {
    /// First step of the range.
    pub from: StepId,
    /// Last step of the range, `None` for open-ended.
    #[serde(default)]
    pub to: Option<StepId>,
    /// Step to resume at.
    pub resume_at: StepId,
}

impl ResumeCollapse {
    fn covers(&self, step: StepId) -> bool {
        step >= self.from && self.to.is_none_or(|to| step <= to)
    }
}

/// Allow-list of interactive-safe steps plus special-cased collapses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePolicy {
    /// Steps that wait for user input.
    #[serde(default)]
    pub safe_steps: BTreeSet<StepId>,
    /// Ranges that resume at a fixed step.
    #[serde(default)]
    pub resume_collapses: Vec<ResumeCollapse>,
}

impl ResumePolicy {
    /// Whether `step` is in the allow-list.
    #[must_use]
    pub fn is_safe(&self, step: StepId) -> bool {
        self.safe_steps.contains(&step)
    }

    /// Maps a persisted step onto the step to resume at.
    ///
    /// Collapses win; otherwise the nearest safe step at or below `saved` is
    /// used, falling back to the first step.
    #[must_use]
    pub fn resume_step(&self, saved: StepId) -> StepId {
        if let Some(collapse) = self.resume_collapses.iter().find(|c| c.covers(saved)) {
            return collapse.resume_at;
        }
        self.safe_steps
            .range(..=saved)
            .next_back()
            .copied()
            .unwrap_or(0)
    }
}
