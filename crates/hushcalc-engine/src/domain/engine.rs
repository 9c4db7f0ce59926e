//! The narrative state machine.
//!
//! `NarrativeEngine` is the single owner of `EngineState`. Every intent is
//! applied to a draft copy of the state; the draft replaces the live state
//! only if the intent is accepted, so a rejected intent never leaves a
//! half-applied change behind. Effects accumulate as uncommitted effects
//! until the session drains them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hushcalc_minigames::MiniGameOutcome;
use hushcalc_story::StepGraph;
use hushcalc_story::step::{SpecialBehavior, StepAction, StepConfig, StepId, TERMINAL};
use tracing::{debug, info};

use super::effects::{Effect, ScheduleOrigin, ScheduleRequest};
use super::intents::{DiscardReason, Intent, IntentOutcome};
use super::projection::VisualProjection;
use super::state::{AWAKENING_THRESHOLD, EngineState, PendingTransition};
use super::timeout::{Gate, TimeoutController};

/// The narrative state machine.
#[derive(Debug)]
pub struct NarrativeEngine {
    graph: Arc<StepGraph>,
    state: EngineState,
    uncommitted_effects: Vec<Effect>,
}

impl NarrativeEngine {
    /// Creates an engine over `graph` starting from `state`.
    #[must_use]
    pub fn new(graph: Arc<StepGraph>, state: EngineState) -> Self {
        Self {
            graph,
            state,
            uncommitted_effects: Vec::new(),
        }
    }

    /// Live state.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The step graph.
    #[must_use]
    pub fn graph(&self) -> &StepGraph {
        &self.graph
    }

    /// Configuration of the current step.
    #[must_use]
    pub fn current_config(&self) -> &StepConfig {
        self.graph.get(self.state.current_step)
    }

    /// Visual projection of the live state.
    #[must_use]
    pub fn projection(&self) -> VisualProjection {
        VisualProjection::from(&self.state)
    }

    /// Effects not yet drained.
    #[must_use]
    pub fn uncommitted_effects(&self) -> &[Effect] {
        &self.uncommitted_effects
    }

    /// Drains the uncommitted effects.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.uncommitted_effects)
    }

    /// Replaces the state wholesale, dropping uncommitted effects. Used when
    /// the state is reloaded or reset.
    pub fn replace_state(&mut self, state: EngineState) {
        self.state = state;
        self.uncommitted_effects.clear();
    }

    /// Applies `intent` at `now`.
    pub fn handle(&mut self, intent: Intent, now: DateTime<Utc>) -> IntentOutcome {
        let name = intent.name();
        let persist = !matches!(intent, Intent::ScreenTimeElapsed { .. });
        let mut draft = Transition {
            graph: &self.graph,
            state: self.state.clone(),
            effects: Vec::new(),
            now,
        };

        let outcome = draft.apply(intent);
        let Transition {
            state: next,
            mut effects,
            ..
        } = draft;

        match outcome {
            IntentOutcome::Accepted => {
                let after = VisualProjection::from(&next);
                if VisualProjection::from(&self.state) != after {
                    effects.push(Effect::VisualChanged(after));
                }
                if persist {
                    effects.push(Effect::Persist);
                }
                debug!(
                    intent = name,
                    step = next.current_step,
                    effects = effects.len(),
                    "intent accepted"
                );
                self.state = next;
                self.uncommitted_effects.extend(effects);
            }
            IntentOutcome::Discarded(reason) => {
                debug!(intent = name, ?reason, step = self.state.current_step, "intent discarded");
            }
            IntentOutcome::Unchanged => {}
        }
        outcome
    }
}

/// A draft of the state being changed by one intent.
struct Transition<'a> {
    graph: &'a StepGraph,
    state: EngineState,
    effects: Vec<Effect>,
    now: DateTime<Utc>,
}

impl<'a> Transition<'a> {
    fn apply(&mut self, intent: Intent) -> IntentOutcome {
        match intent {
            Intent::CalculationCompleted => self.calculation_completed(),
            Intent::ScreenTimeElapsed { millis } => {
                if self.state.is_muted {
                    return IntentOutcome::Discarded(DiscardReason::Muted);
                }
                self.state.total_screen_time_ms += millis;
                IntentOutcome::Accepted
            }
            Intent::Mute => self.mute(),
            Intent::Unmute => self.unmute(),
            Intent::Tick => self.tick(),
            other => self.narrative(other),
        }
    }

    fn config(&self, id: StepId) -> &'a StepConfig {
        self.graph.get(id)
    }

    fn current(&self) -> &'a StepConfig {
        self.config(self.state.current_step)
    }

    // --- intent handlers -------------------------------------------------

    fn calculation_completed(&mut self) -> IntentOutcome {
        self.state.total_calculations += 1;
        self.state.equals_count = self.state.equals_count.saturating_add(1);
        if !self.state.in_conversation
            && !self.state.is_muted
            && self.state.equals_count >= AWAKENING_THRESHOLD
        {
            info!(equals_count = self.state.equals_count, "calculator awakens");
            self.state.in_conversation = true;
            self.state.paused_at_step = None;
            self.present(0);
        }
        IntentOutcome::Accepted
    }

    fn mute(&mut self) -> IntentOutcome {
        if self.state.is_muted {
            return IntentOutcome::Discarded(DiscardReason::Muted);
        }
        self.state.is_muted = true;
        self.state.paused_at_step = self
            .state
            .in_conversation
            .then_some(self.state.current_step);
        self.effects.push(Effect::HaltTickers);
        self.effects.push(Effect::ClearMessage);
        IntentOutcome::Accepted
    }

    fn unmute(&mut self) -> IntentOutcome {
        if !self.state.is_muted {
            return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
        }
        self.state.is_muted = false;
        self.effects.push(Effect::ResumeTickers);
        if self.state.in_conversation {
            let step = self.state.paused_at_step.unwrap_or(self.state.current_step);
            let text = if let Some(pending) = &self.state.pending_auto_step {
                pending.message.clone()
            } else if TimeoutController::is_blocked(&self.state, self.now)
                || self.state.active_mini_game.is_some()
                || self.state.pending_permission.is_some()
            {
                self.state.last_message.clone()
            } else {
                self.config(step).prompt_message.clone()
            };
            self.state.last_message.clone_from(&text);
            self.effects.push(Effect::ShowMessage { text });
        }
        self.state.paused_at_step = None;
        IntentOutcome::Accepted
    }

    fn tick(&mut self) -> IntentOutcome {
        if self.state.is_muted || TimeoutController::gate(&self.state, self.now) != Gate::Expired {
            return IntentOutcome::Unchanged;
        }
        let cleared = TimeoutController::clear_expired(&mut self.state, self.now);
        debug!(?cleared, "suppression windows expired");
        if self.state.in_conversation
            && !self.state.has_pending_transition()
            && self.state.active_mini_game.is_none()
            && self.state.pending_permission.is_none()
        {
            self.present(self.state.current_step);
        }
        IntentOutcome::Accepted
    }

    fn narrative(&mut self, intent: Intent) -> IntentOutcome {
        if !self.state.in_conversation {
            return IntentOutcome::Discarded(DiscardReason::NotConversing);
        }
        if self.state.is_muted {
            return IntentOutcome::Discarded(DiscardReason::Muted);
        }
        match intent {
            Intent::CommitScheduled { from_step, to_step } => self.commit(from_step, to_step),
            Intent::MiniGameFinished(outcome) => self.mini_game_finished(outcome),
            Intent::Resume => self.resume(),
            Intent::Agree { input } => {
                if let Some(outcome) = self.input_gate(true) {
                    return outcome;
                }
                self.agree(&input)
            }
            Intent::Decline { .. } => {
                if let Some(outcome) = self.input_gate(true) {
                    return outcome;
                }
                self.decline()
            }
            Intent::CountdownElapsed { step } => {
                if let Some(outcome) = self.input_gate(false) {
                    return outcome;
                }
                self.countdown_elapsed(step)
            }
            Intent::PermissionResolved { kind, granted } => {
                if self.state.pending_permission != Some(kind) {
                    return IntentOutcome::Discarded(DiscardReason::Stale);
                }
                self.state.pending_permission = None;
                let step = self.current();
                if granted {
                    self.success_path(step)
                } else {
                    self.decline_path(step)
                }
            }
            Intent::CalculationCompleted
            | Intent::ScreenTimeElapsed { .. }
            | Intent::Mute
            | Intent::Unmute
            | Intent::Tick => IntentOutcome::Unchanged,
        }
    }

    /// Rejects user input while a window runs or a mini-game holds focus.
    /// A lapsed window is cleared; with `reopen` the gesture is consumed to
    /// re-show the step.
    fn input_gate(&mut self, reopen: bool) -> Option<IntentOutcome> {
        match TimeoutController::gate(&self.state, self.now) {
            Gate::Blocked { .. } => return Some(IntentOutcome::Discarded(DiscardReason::Blocked)),
            Gate::Expired => {
                TimeoutController::clear_expired(&mut self.state, self.now);
                if reopen
                    && !self.state.has_pending_transition()
                    && self.state.active_mini_game.is_none()
                {
                    self.present(self.state.current_step);
                    return Some(IntentOutcome::Accepted);
                }
            }
            Gate::Open => {}
        }
        if self.state.active_mini_game.is_some() {
            return Some(IntentOutcome::Discarded(DiscardReason::MiniGameActive));
        }
        None
    }

    fn commit(&mut self, from_step: StepId, to_step: StepId) -> IntentOutcome {
        let matches_pending = self
            .state
            .pending_auto_step
            .as_ref()
            .is_some_and(|p| p.to_step == to_step);
        if self.state.current_step != from_step || !matches_pending {
            return IntentOutcome::Discarded(DiscardReason::Stale);
        }
        if self.state.active_mini_game.is_some() {
            return IntentOutcome::Discarded(DiscardReason::MiniGameActive);
        }
        self.state.pending_auto_step = None;

        if to_step == TERMINAL {
            self.end_conversation();
        } else if TimeoutController::is_blocked(&self.state, self.now) {
            debug!(from_step, to_step, "moving silently while blocked");
            self.state.enter(to_step, self.config(to_step));
        } else {
            self.present(to_step);
        }
        IntentOutcome::Accepted
    }

    fn resume(&mut self) -> IntentOutcome {
        if self.state.active_mini_game.is_some() {
            return IntentOutcome::Discarded(DiscardReason::MiniGameActive);
        }
        match TimeoutController::gate(&self.state, self.now) {
            Gate::Blocked { .. } => return IntentOutcome::Discarded(DiscardReason::Blocked),
            Gate::Expired => {
                TimeoutController::clear_expired(&mut self.state, self.now);
            }
            Gate::Open => {}
        }
        if self.state.has_pending_transition() {
            return IntentOutcome::Unchanged;
        }
        self.present(self.state.current_step);
        IntentOutcome::Accepted
    }

    fn agree(&mut self, input: &str) -> IntentOutcome {
        if self.state.has_pending_transition() || self.state.pending_permission.is_some() {
            return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
        }
        let step = self.current();
        match step.special() {
            SpecialBehavior::AgeBranching => self.answer_age(step, input),
            SpecialBehavior::ChoiceRouting => self.answer_choice(step, input),
            SpecialBehavior::MiniGame => IntentOutcome::Discarded(DiscardReason::InvalidTransition),
            SpecialBehavior::PermissionGate => {
                let Some(kind) = step.request_permission else {
                    return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
                };
                self.state.pending_permission = Some(kind);
                self.effects.push(Effect::RequestPermission { kind });
                IntentOutcome::Accepted
            }
            SpecialBehavior::Plain if step.awaiting_number => self.answer_number(step, input),
            SpecialBehavior::Plain => {
                if !step.success_message.is_empty() {
                    self.success_path(step)
                } else if !step.wrong_plus_message.is_empty() {
                    self.show(&step.wrong_plus_message);
                    IntentOutcome::Accepted
                } else if step.next_step_on_success != TERMINAL {
                    self.queue(step.next_step_on_success, 0, ScheduleOrigin::Engine);
                    IntentOutcome::Accepted
                } else {
                    IntentOutcome::Discarded(DiscardReason::InvalidTransition)
                }
            }
        }
    }

    fn decline(&mut self) -> IntentOutcome {
        if self.state.has_pending_transition() || self.state.pending_permission.is_some() {
            return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
        }
        let step = self.current();
        if step.mini_game.is_some() {
            return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
        }
        self.decline_path(step)
    }

    fn countdown_elapsed(&mut self, step_id: StepId) -> IntentOutcome {
        if step_id != self.state.current_step {
            return IntentOutcome::Discarded(DiscardReason::Stale);
        }
        if self.state.has_pending_transition() || self.state.pending_permission.is_some() {
            return IntentOutcome::Discarded(DiscardReason::InvalidTransition);
        }
        debug!(step = step_id, "countdown elapsed");
        self.decline_path(self.current())
    }

    fn mini_game_finished(&mut self, outcome: MiniGameOutcome) -> IntentOutcome {
        if self.state.active_mini_game != Some(outcome.kind) {
            return IntentOutcome::Discarded(DiscardReason::Stale);
        }
        self.state.active_mini_game = None;
        let Some(spec) = &self.current().mini_game else {
            return IntentOutcome::Discarded(DiscardReason::Stale);
        };

        if outcome.completed {
            info!(kind = outcome.kind.as_str(), round = outcome.round, "mini-game won");
            self.present(spec.on_success);
        } else {
            info!(kind = outcome.kind.as_str(), round = outcome.round, "mini-game lost");
            if spec.punishment_minutes > 0 {
                self.state.scramble_timeout_count += 1;
                let minutes =
                    i64::from(spec.punishment_minutes) * i64::from(self.state.scramble_timeout_count);
                self.state.scramble_punishment_until = Some(self.now + Duration::minutes(minutes));
            }
            self.present(spec.on_failure.unwrap_or(self.state.current_step));
        }
        IntentOutcome::Accepted
    }

    // --- answers ---------------------------------------------------------

    fn answer_number(&mut self, step: &'a StepConfig, input: &str) -> IntentOutcome {
        if input == step.expected_number {
            return self.success_path(step);
        }
        self.show(&step.wrong_number_message());
        self.start_timeout(step);
        IntentOutcome::Accepted
    }

    fn answer_age(&mut self, step: &'a StepConfig, input: &str) -> IntentOutcome {
        // Ages beyond u32 still belong to the open-ended bracket.
        let bracket = input
            .trim()
            .parse::<u64>()
            .ok()
            .map(|age| u32::try_from(age).unwrap_or(u32::MAX))
            .and_then(|age| step.age_bracket(age));
        match bracket {
            Some(bracket) => {
                self.state.clear_awaiting();
                self.show(&bracket.response);
                match bracket.next_step {
                    Some(next) => self.queue(next, 0, ScheduleOrigin::Engine),
                    None => self.end_conversation(),
                }
            }
            None => {
                self.show(&step.wrong_number_message());
                self.start_timeout(step);
            }
        }
        IntentOutcome::Accepted
    }

    fn answer_choice(&mut self, step: &'a StepConfig, input: &str) -> IntentOutcome {
        let route = input
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|choice| step.valid_choices.contains(choice))
            .and_then(|choice| step.choice_routes.get(&choice).copied());
        match route {
            Some(TERMINAL) => self.end_conversation(),
            Some(next) => self.present(next),
            None => {
                let message = if step.invalid_choice_message.is_empty() {
                    &step.prompt_message
                } else {
                    &step.invalid_choice_message
                };
                self.show(message);
            }
        }
        IntentOutcome::Accepted
    }

    // --- paths -----------------------------------------------------------

    fn success_path(&mut self, step: &'a StepConfig) -> IntentOutcome {
        self.apply_actions(&step.on_success);
        self.state.clear_awaiting();
        if !step.success_message.is_empty() {
            self.show(&step.success_message);
        }
        if step.next_step_on_success == TERMINAL {
            self.end_conversation();
        } else {
            self.queue(step.next_step_on_success, 0, ScheduleOrigin::Engine);
        }
        IntentOutcome::Accepted
    }

    fn decline_path(&mut self, step: &'a StepConfig) -> IntentOutcome {
        if step.decline_message.is_empty() {
            if !step.wrong_minus_message.is_empty() {
                self.show(&step.wrong_minus_message);
            } else if step.awaiting_number || step.awaiting_choice {
                self.show(&step.prompt_message);
            } else {
                self.end_conversation();
            }
            return IntentOutcome::Accepted;
        }

        self.apply_actions(&step.on_decline);
        self.show(&step.decline_message);
        if step.timeout_minutes > 0 {
            self.state.silent_until =
                Some(self.now + Duration::minutes(i64::from(step.timeout_minutes)));
        }
        if !step.continue_conversation {
            self.end_conversation();
        } else if step.next_step_on_decline != TERMINAL {
            self.state.clear_awaiting();
            self.queue(step.next_step_on_decline, 0, ScheduleOrigin::Engine);
        }
        IntentOutcome::Accepted
    }

    // --- building blocks -------------------------------------------------

    /// Enters `id` and presents it: entry actions, prompt, mini-game,
    /// countdown and auto-progress.
    fn present(&mut self, id: StepId) {
        if !self.graph.contains(id) {
            debug!(step = id, "unknown step, ending conversation");
            self.end_conversation();
            return;
        }
        let step = self.config(id);
        self.state.enter(id, step);
        self.apply_actions(&step.on_enter);
        self.show(&step.prompt_message);

        if let Some(game) = &step.mini_game {
            self.state.active_mini_game = Some(game.kind);
            self.effects.push(Effect::StartMiniGame(game.clone()));
        }
        if step.countdown_seconds > 0 {
            self.effects.push(Effect::StartCountdown {
                step: id,
                seconds: step.countdown_seconds,
            });
        }
        if step.is_monologue() && !self.state.has_pending_transition() {
            self.queue(
                step.next_step_on_success,
                step.auto_progress_delay_ms,
                ScheduleOrigin::Engine,
            );
        }
    }

    /// Shows `text`. A text with a monologue cue queues its continuation
    /// unless a transition is already pending.
    fn show(&mut self, text: &str) {
        self.state.last_message = text.to_owned();
        self.effects.push(Effect::ShowMessage {
            text: text.to_owned(),
        });
        if self.state.has_pending_transition() {
            return;
        }
        let graph = self.graph;
        if let Some(cue) = graph.monologue().cue_for(text) {
            self.queue(cue.next_step, cue.delay_ms, ScheduleOrigin::Monologue);
        }
    }

    fn queue(&mut self, to_step: StepId, delay_ms: u64, origin: ScheduleOrigin) {
        self.state.pending_auto_step = Some(PendingTransition {
            to_step,
            message: self.state.last_message.clone(),
        });
        self.effects.push(Effect::Schedule(ScheduleRequest {
            from_step: self.state.current_step,
            to_step,
            wait_for_typing: true,
            delay_ms,
            origin,
        }));
    }

    fn start_timeout(&mut self, step: &StepConfig) {
        if step.timeout_minutes > 0 {
            self.state.timeout_until =
                Some(self.now + Duration::minutes(i64::from(step.timeout_minutes)));
        }
    }

    fn end_conversation(&mut self) {
        info!(step = self.state.current_step, "conversation ended");
        self.state.in_conversation = false;
        self.state.equals_count = 0;
        self.state.clear_awaiting();
        self.state.pending_auto_step = None;
        self.state.pending_permission = None;
        if self.state.active_mini_game.take().is_some() {
            self.effects.push(Effect::StopMiniGame);
        }
        self.effects.push(Effect::CancelSchedules);
        self.effects.push(Effect::ConversationEnded);
    }

    fn apply_actions(&mut self, actions: &[StepAction]) {
        for action in actions {
            match action {
                StepAction::InvertColors { enabled } => self.state.inverted_colors = *enabled,
                StepAction::DarkenButtons { buttons } => {
                    self.state.dark_buttons.extend(buttons.iter().cloned());
                }
                StepAction::RestoreButtons => self.state.dark_buttons.clear(),
                StepAction::DamageMinus => self.state.minus_damaged = true,
                StepAction::BreakMinus => {
                    self.state.minus_damaged = true;
                    self.state.minus_broken = true;
                }
                StepAction::RepairMinus => {
                    self.state.minus_damaged = false;
                    self.state.minus_broken = false;
                }
                StepAction::NeedsRestart => self.state.needs_restart = true,
                StepAction::AcceptTerms => self.state.terms_accepted = true,
                StepAction::OpenLink { url } => {
                    self.effects.push(Effect::OpenExternalLink { url: url.clone() });
                }
                StepAction::WriteDisclosureFile => self.effects.push(Effect::WriteDisclosureFile),
                StepAction::ScheduleNotification { minutes } => {
                    self.effects.push(Effect::ScheduleNotification { minutes: *minutes });
                }
                StepAction::Haptic {
                    duration_ms,
                    amplitude,
                } => self.effects.push(Effect::HapticPulse {
                    duration_ms: *duration_ms,
                    amplitude: *amplitude,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushcalc_core::ports::PermissionKind;
    use hushcalc_story::step::MiniGameKind;
    use hushcalc_test_support::test_epoch;

    fn engine_at(step: StepId) -> NarrativeEngine {
        let graph = Arc::new(StepGraph::embedded().clone());
        let config = graph.get(step).clone();
        let mut state = EngineState {
            in_conversation: true,
            ..EngineState::default()
        };
        state.enter(step, &config);
        state.last_message = config.prompt_message;
        NarrativeEngine::new(graph, state)
    }

    fn agree(input: &str) -> Intent {
        Intent::Agree {
            input: input.to_owned(),
        }
    }

    fn decline() -> Intent {
        Intent::Decline {
            input: String::new(),
        }
    }

    fn shown(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::ShowMessage { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn scheduled(effects: &[Effect]) -> Vec<ScheduleRequest> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Schedule(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_thirteenth_calculation_awakens_at_step_zero() {
        // Arrange
        let graph = Arc::new(StepGraph::embedded().clone());
        let mut engine = NarrativeEngine::new(graph, EngineState::default());
        let now = test_epoch();

        // Act
        for _ in 0..12 {
            engine.handle(Intent::CalculationCompleted, now);
        }
        let before = engine.state().in_conversation;
        engine.handle(Intent::CalculationCompleted, now);

        // Assert
        assert!(!before);
        assert!(engine.state().in_conversation);
        assert_eq!(engine.state().current_step, 0);
        assert_eq!(
            engine.state().last_message,
            "Will you talk to me? Double-click + for yes."
        );
        assert_eq!(engine.state().total_calculations, 13);
    }

    #[test]
    fn test_no_awakening_while_muted() {
        let graph = Arc::new(StepGraph::embedded().clone());
        let state = EngineState {
            is_muted: true,
            equals_count: 20,
            ..EngineState::default()
        };
        let mut engine = NarrativeEngine::new(graph, state);

        engine.handle(Intent::CalculationCompleted, test_epoch());

        assert!(!engine.state().in_conversation);
        assert_eq!(engine.state().equals_count, 21);
    }

    #[test]
    fn test_agree_shows_success_and_defers_the_step_change() {
        // Arrange
        let mut engine = engine_at(0);
        let now = test_epoch();

        // Act
        let outcome = engine.handle(agree(""), now);

        // Assert
        assert_eq!(outcome, IntentOutcome::Accepted);
        let effects = engine.take_effects();
        assert_eq!(shown(&effects), vec!["Oh! You actually heard me.".to_owned()]);
        let requests = scheduled(&effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].from_step, 0);
        assert_eq!(requests[0].to_step, 1);
        assert!(requests[0].wait_for_typing);
        assert_eq!(engine.state().current_step, 0);
        assert!(effects.contains(&Effect::Persist));
    }

    #[test]
    fn test_answer_cannot_be_submitted_twice_while_pending() {
        let mut engine = engine_at(0);
        let now = test_epoch();
        engine.handle(agree(""), now);

        let second = engine.handle(agree(""), now);

        assert_eq!(
            second,
            IntentOutcome::Discarded(DiscardReason::InvalidTransition)
        );
    }

    #[test]
    fn test_commit_enters_the_next_step() {
        let mut engine = engine_at(0);
        let now = test_epoch();
        engine.handle(agree(""), now);
        engine.take_effects();

        let outcome = engine.handle(
            Intent::CommitScheduled {
                from_step: 0,
                to_step: 1,
            },
            now,
        );

        assert_eq!(outcome, IntentOutcome::Accepted);
        assert_eq!(engine.state().current_step, 1);
        assert!(!engine.state().has_pending_transition());
        assert_eq!(
            shown(&engine.take_effects()),
            vec![StepGraph::embedded().get(1).prompt_message.clone()]
        );
    }

    #[test]
    fn test_stale_commit_is_dropped() {
        let mut engine = engine_at(4);

        let outcome = engine.handle(
            Intent::CommitScheduled {
                from_step: 3,
                to_step: 4,
            },
            test_epoch(),
        );

        assert_eq!(outcome, IntentOutcome::Discarded(DiscardReason::Stale));
        assert!(engine.uncommitted_effects().is_empty());
    }

    #[test]
    fn test_exact_answer_takes_success_path() {
        let mut engine = engine_at(3);

        engine.handle(agree("1623"), test_epoch());

        let effects = engine.take_effects();
        assert_eq!(
            scheduled(&effects)[0].to_step,
            StepGraph::embedded().get(3).next_step_on_success
        );
        assert!(!engine.state().awaiting_number);
        assert_eq!(engine.state().current_step, 3);
    }

    #[test]
    fn test_wrong_answer_shows_prefix_and_prompt_and_stays() {
        let mut engine = engine_at(4);

        engine.handle(agree("1624"), test_epoch());

        assert_eq!(
            engine.state().last_message,
            "Not quite. Try the internet - heard it's amazing. When did he start ruling Vietnam?"
        );
        assert_eq!(engine.state().current_step, 4);
        assert!(engine.state().awaiting_number);
        assert!(scheduled(engine.uncommitted_effects()).is_empty());
    }

    #[test]
    fn test_age_brackets_route_or_end() {
        // Arrange
        let now = test_epoch();
        let mut young = engine_at(5);
        let mut adult = engine_at(5);
        let mut garbage = engine_at(5);

        // Act
        young.handle(agree("14"), now);
        adult.handle(agree("30"), now);
        garbage.handle(agree("abc"), now);

        // Assert
        assert!(!young.state().in_conversation);
        assert_eq!(young.state().equals_count, 0);
        assert_eq!(scheduled(adult.uncommitted_effects())[0].to_step, 6);
        assert!(garbage.state().in_conversation);
        assert_eq!(
            garbage.state().timeout_until,
            Some(now + Duration::minutes(1))
        );
    }

    #[test]
    fn test_very_large_age_falls_into_the_open_ended_bracket() {
        // Arrange
        let now = test_epoch();
        let mut engine = engine_at(5);

        // Act
        let outcome = engine.handle(agree("5000000000"), now);

        // Assert
        assert_eq!(outcome, IntentOutcome::Accepted);
        assert_eq!(
            engine.state().last_message,
            "Sure you are. I'll pretend I believe you."
        );
        assert!(engine.state().timeout_until.is_none());
        assert_eq!(scheduled(engine.uncommitted_effects())[0].to_step, 6);
    }

    #[test]
    fn test_invalid_choice_stays_and_valid_choice_jumps_immediately() {
        let now = test_epoch();
        let mut engine = engine_at(8);

        engine.handle(agree("7"), now);
        assert_eq!(engine.state().current_step, 8);
        assert_eq!(
            engine.state().last_message,
            StepGraph::embedded().get(8).invalid_choice_message
        );

        engine.handle(agree("2"), now);
        assert_eq!(engine.state().current_step, 10);
    }

    #[test]
    fn test_decline_on_choice_step_shows_wrong_minus() {
        let mut engine = engine_at(8);

        engine.handle(decline(), test_epoch());

        assert_eq!(
            engine.state().last_message,
            "Minus is not an answer. Pick a number."
        );
        assert!(engine.state().in_conversation);
    }

    #[test]
    fn test_decline_silence_moves_silently_then_presents_on_expiry() {
        // Arrange
        let now = test_epoch();
        let mut engine = engine_at(7);
        engine.handle(decline(), now);
        assert_eq!(
            engine.state().silent_until,
            Some(now + Duration::minutes(1))
        );
        engine.take_effects();

        // Act
        let blocked = engine.handle(agree(""), now + Duration::seconds(5));
        engine.handle(
            Intent::CommitScheduled {
                from_step: 7,
                to_step: 8,
            },
            now + Duration::seconds(5),
        );
        let silent_effects = engine.take_effects();
        engine.handle(Intent::Tick, now + Duration::seconds(61));

        // Assert
        assert_eq!(blocked, IntentOutcome::Discarded(DiscardReason::Blocked));
        assert!(shown(&silent_effects).is_empty());
        assert_eq!(engine.state().current_step, 8);
        assert!(engine.state().silent_until.is_none());
        assert_eq!(
            shown(&engine.take_effects()),
            vec![StepGraph::embedded().get(8).prompt_message.clone()]
        );
    }

    #[test]
    fn test_permission_denied_takes_decline_path() {
        // Arrange
        let now = test_epoch();
        let mut engine = engine_at(14);

        // Act
        engine.handle(agree(""), now);
        let requested = engine.take_effects();
        engine.handle(
            Intent::PermissionResolved {
                kind: PermissionKind::Notifications,
                granted: false,
            },
            now,
        );

        // Assert
        assert!(requested.contains(&Effect::RequestPermission {
            kind: PermissionKind::Notifications
        }));
        let effects = engine.take_effects();
        assert_eq!(
            shown(&effects),
            vec!["Okay. I'll just wait here, then.".to_owned()]
        );
        assert_eq!(scheduled(&effects)[0].to_step, 15);
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::ScheduleNotification { .. }))
        );
    }

    #[test]
    fn test_permission_granted_runs_success_actions() {
        let now = test_epoch();
        let mut engine = engine_at(14);
        engine.handle(agree(""), now);
        engine.take_effects();

        engine.handle(
            Intent::PermissionResolved {
                kind: PermissionKind::Notifications,
                granted: true,
            },
            now,
        );

        assert!(
            engine
                .take_effects()
                .contains(&Effect::ScheduleNotification { minutes: 60 })
        );
    }

    #[test]
    fn test_presenting_a_mini_game_step_starts_the_game() {
        let now = test_epoch();
        let mut engine = engine_at(30);
        engine.handle(agree(""), now);
        engine.take_effects();

        engine.handle(
            Intent::CommitScheduled {
                from_step: 30,
                to_step: 31,
            },
            now,
        );

        assert_eq!(
            engine.state().active_mini_game,
            Some(MiniGameKind::WhackAMole)
        );
        let effects = engine.take_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::StartMiniGame(_))));
        assert!(effects.iter().any(|e| matches!(e, Effect::VisualChanged(_))));
        assert_eq!(
            engine.handle(agree(""), now),
            IntentOutcome::Discarded(DiscardReason::MiniGameActive)
        );
    }

    #[test]
    fn test_scramble_failure_escalates_punishment() {
        // Arrange
        let now = test_epoch();
        let mut engine = engine_at(60);
        engine.replace_state(EngineState {
            active_mini_game: Some(MiniGameKind::Scramble),
            scramble_timeout_count: 1,
            ..engine.state().clone()
        });
        let lost = MiniGameOutcome {
            kind: MiniGameKind::Scramble,
            completed: false,
            round: 1,
        };

        // Act
        engine.handle(Intent::MiniGameFinished(lost), now);

        // Assert
        assert_eq!(engine.state().scramble_timeout_count, 2);
        assert_eq!(
            engine.state().scramble_punishment_until,
            Some(now + Duration::minutes(4))
        );
        assert_eq!(engine.state().current_step, 62);
        assert!(engine.state().active_mini_game.is_none());
    }

    #[test]
    fn test_mute_then_unmute_represents_the_prompt() {
        // Arrange
        let now = test_epoch();
        let mut engine = engine_at(3);

        // Act
        engine.handle(Intent::Mute, now);
        let muted = engine.take_effects();
        let ignored = engine.handle(agree("1623"), now);
        engine.handle(Intent::Unmute, now);

        // Assert
        assert!(muted.contains(&Effect::HaltTickers));
        assert!(muted.contains(&Effect::ClearMessage));
        assert_eq!(ignored, IntentOutcome::Discarded(DiscardReason::Muted));
        let effects = engine.take_effects();
        assert!(effects.contains(&Effect::ResumeTickers));
        assert_eq!(
            shown(&effects),
            vec![StepGraph::embedded().get(3).prompt_message.clone()]
        );
        assert!(engine.state().paused_at_step.is_none());
    }

    #[test]
    fn test_countdown_elapsed_takes_decline_continuation() {
        let mut engine = engine_at(67);

        engine.handle(Intent::CountdownElapsed { step: 67 }, test_epoch());

        assert_eq!(scheduled(engine.uncommitted_effects())[0].to_step, 69);
    }

    #[test]
    fn test_monologue_cue_queues_once() {
        let now = test_epoch();
        let mut engine = engine_at(94);
        engine.handle(agree(""), now);
        engine.take_effects();

        engine.handle(
            Intent::CommitScheduled {
                from_step: 94,
                to_step: 95,
            },
            now,
        );

        let requests = scheduled(&engine.take_effects());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].origin, ScheduleOrigin::Monologue);
        assert_eq!(requests[0].to_step, 96);
        assert_eq!(requests[0].delay_ms, 1500);
    }

    #[test]
    fn test_broken_minus_is_recorded_on_decline() {
        let mut engine = engine_at(28);

        engine.handle(decline(), test_epoch());

        assert!(engine.state().minus_broken);
        assert!(
            engine
                .take_effects()
                .contains(&Effect::HapticPulse {
                    duration_ms: 400,
                    amplitude: 255
                })
        );
    }

    #[test]
    fn test_narrative_intents_need_a_conversation() {
        let graph = Arc::new(StepGraph::embedded().clone());
        let mut engine = NarrativeEngine::new(graph, EngineState::default());

        let outcome = engine.handle(agree("1"), test_epoch());

        assert_eq!(
            outcome,
            IntentOutcome::Discarded(DiscardReason::NotConversing)
        );
    }
}
