//! The step graph: a total lookup from step id to configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use hushcalc_core::error::DomainError;
use serde::Deserialize;
use tracing::debug;

use crate::monologue::MonologueTable;
use crate::recovery::{ResumeCollapse, ResumePolicy};
use crate::step::{StepConfig, StepId, TERMINAL};

const EMBEDDED_STORY: &str = include_str!("../story/steps.yaml");

static EMBEDDED_GRAPH: LazyLock<StepGraph> = LazyLock::new(|| {
    // The embedded story is covered by tests; a parse failure is a build defect.
    StepGraph::from_yaml(EMBEDDED_STORY).expect("embedded story must parse")
});

/// Raw shape of the story file.
#[derive(Debug, Deserialize)]
struct StoryFile {
    steps: BTreeMap<StepId, StepConfig>,
    #[serde(default)]
    safe_steps: BTreeSet<StepId>,
    #[serde(default)]
    resume_collapses: Vec<ResumeCollapse>,
    #[serde(default)]
    monologue: MonologueTable,
}

/// Immutable step graph.
#[derive(Debug, Clone)]
pub struct StepGraph {
    steps: BTreeMap<StepId, StepConfig>,
    unknown: StepConfig,
    resume: ResumePolicy,
    monologue: MonologueTable,
}

impl StepGraph {
    /// The story compiled into the binary.
    #[must_use]
    pub fn embedded() -> &'static StepGraph {
        &EMBEDDED_GRAPH
    }

    /// Parses a story file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the YAML does not match the story
    /// schema.
    pub fn from_yaml(source: &str) -> Result<Self, DomainError> {
        let file: StoryFile = serde_yaml::from_str(source)
            .map_err(|e| DomainError::Validation(format!("story parse failed: {e}")))?;
        debug!(steps = file.steps.len(), "story loaded");
        Ok(Self {
            steps: file.steps,
            unknown: StepConfig::unknown(),
            resume: ResumePolicy {
                safe_steps: file.safe_steps,
                resume_collapses: file.resume_collapses,
            },
            monologue: file.monologue,
        })
    }

    /// Builds a graph directly from configurations, for tests and tools.
    #[must_use]
    pub fn from_steps(
        steps: BTreeMap<StepId, StepConfig>,
        resume: ResumePolicy,
        monologue: MonologueTable,
    ) -> Self {
        Self {
            steps,
            unknown: StepConfig::unknown(),
            resume,
            monologue,
        }
    }

    /// Returns the configuration of `id`. Unknown ids resolve to a safe
    /// terminal configuration.
    #[must_use]
    pub fn get(&self, id: StepId) -> &StepConfig {
        self.steps.get(&id).unwrap_or(&self.unknown)
    }

    /// Whether `id` is a real step.
    #[must_use]
    pub fn contains(&self, id: StepId) -> bool {
        self.steps.contains_key(&id)
    }

    /// All step ids in ascending order.
    pub fn step_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps.keys().copied()
    }

    /// The crash-resume policy.
    #[must_use]
    pub fn resume_policy(&self) -> &ResumePolicy {
        &self.resume
    }

    /// The content-keyed auto-advance table.
    #[must_use]
    pub fn monologue(&self) -> &MonologueTable {
        &self.monologue
    }

    /// Checks that every reference leads to `TERMINAL` or a real step, that
    /// safe steps exist and wait for input, and that monologue cues lead
    /// somewhere real.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` listing every problem found.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();

        for (id, step) in &self.steps {
            for target in step.referenced_steps() {
                if target != TERMINAL && !self.contains(target) {
                    problems.push(format!("step {id} references missing step {target}"));
                }
            }
            if step.awaiting_choice {
                for choice in &step.valid_choices {
                    if !step.choice_routes.contains_key(choice) {
                        problems.push(format!("step {id} has no route for choice {choice}"));
                    }
                }
            }
            if step.awaiting_number
                && !step.is_age_branching()
                && step.expected_number.is_empty()
            {
                problems.push(format!("step {id} awaits a number but expects none"));
            }
        }

        for safe in &self.resume.safe_steps {
            match self.steps.get(safe) {
                None => problems.push(format!("safe step {safe} does not exist")),
                Some(step) if step.is_monologue() || step.mini_game.is_some() => {
                    problems.push(format!("safe step {safe} does not wait for input"));
                }
                Some(_) => {}
            }
        }

        for collapse in &self.resume.resume_collapses {
            if !self.resume.is_safe(collapse.resume_at) {
                problems.push(format!(
                    "collapse from {} resumes at unsafe step {}",
                    collapse.from, collapse.resume_at
                ));
            }
        }

        for cue in self.monologue.cues() {
            if !self.contains(cue.next_step) {
                problems.push(format!(
                    "monologue cue {:?} leads to missing step {}",
                    cue.message, cue.next_step
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{MiniGameKind, SpecialBehavior};

    #[test]
    fn test_embedded_story_parses_and_validates() {
        let graph = StepGraph::embedded();

        let result = graph.validate();

        assert!(result.is_ok(), "{result:?}");
        assert!(graph.contains(0));
        assert!(graph.contains(112));
    }

    #[test]
    fn test_get_is_total_for_unknown_ids() {
        let graph = StepGraph::embedded();

        let step = graph.get(9_999);

        assert!(!step.continue_conversation);
        assert!(step.prompt_message.is_empty());
    }

    #[test]
    fn test_every_next_step_is_terminal_or_resolvable() {
        let graph = StepGraph::embedded();

        for id in graph.step_ids() {
            let step = graph.get(id);
            for target in [step.next_step_on_success, step.next_step_on_decline] {
                assert!(
                    target == TERMINAL || graph.contains(target),
                    "step {id} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_awakening_prompt() {
        let step = StepGraph::embedded().get(0);

        assert_eq!(
            step.prompt_message,
            "Will you talk to me? Double-click + for yes."
        );
    }

    #[test]
    fn test_pascal_and_vietnam_trivia() {
        let graph = StepGraph::embedded();

        assert_eq!(graph.get(3).expected_number, "1623");
        assert_eq!(graph.get(3).next_step_on_success, 4);
        assert_eq!(
            graph.get(4).wrong_number_message(),
            "Not quite. Try the internet - heard it's amazing. When did he start ruling Vietnam?"
        );
    }

    #[test]
    fn test_age_step_has_four_brackets() {
        let graph = StepGraph::embedded();
        let age_step = graph
            .step_ids()
            .map(|id| graph.get(id))
            .find(|s| s.special() == SpecialBehavior::AgeBranching)
            .expect("story has an age step");

        assert_eq!(age_step.age_brackets.len(), 4);
        assert!(age_step.age_bracket(14).unwrap().next_step.is_none());
        assert!(age_step.age_bracket(15).unwrap().next_step.is_some());
        assert!(age_step.age_bracket(100).unwrap().next_step.is_some());
        assert!(age_step.age_bracket(101).is_some());
        assert!(age_step.timeout_minutes > 0);
    }

    #[test]
    fn test_every_mini_game_is_reachable() {
        let graph = StepGraph::embedded();
        let kinds: Vec<MiniGameKind> = graph
            .step_ids()
            .filter_map(|id| graph.get(id).mini_game.as_ref().map(|g| g.kind))
            .collect();

        for kind in [
            MiniGameKind::WhackAMole,
            MiniGameKind::Chaos,
            MiniGameKind::WordGame,
            MiniGameKind::Scramble,
        ] {
            assert!(kinds.contains(&kind), "{kind:?} missing");
        }
    }

    #[test]
    fn test_validate_reports_dangling_reference() {
        let mut steps = BTreeMap::new();
        steps.insert(
            1,
            StepConfig {
                next_step_on_success: 42,
                ..StepConfig::default()
            },
        );
        let graph = StepGraph::from_steps(steps, ResumePolicy::default(), MonologueTable::default());

        let result = graph.validate();

        match result {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("missing step 42")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_yaml_is_validation_error() {
        let result = StepGraph::from_yaml("steps: [not, a, map]");

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
