//! Session orchestrator.
//!
//! A `Session` drives one narrative engine in time. It turns button presses
//! into calculator keys and intents, runs the cooperative tickers (typing,
//! heartbeats, countdown, mini-game timers, scheduler) and carries out the
//! effects the engine emits through the ports. It is the only writer of the
//! engine, so callers must serialize access to it.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hushcalc_core::clock::Clock;
use hushcalc_core::error::DomainError;
use hushcalc_core::ports::{CapabilityPort, PresentationPort};
use hushcalc_core::repository::KeyValueStore;
use hushcalc_core::rng::DeterministicRng;
use hushcalc_minigames::whack::TARGET_BUTTONS;
use hushcalc_minigames::{MiniGameInput, MiniGameOutcome, MiniGameSupervisor};
use hushcalc_story::StepGraph;
use hushcalc_story::step::StepId;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::persistence::PersistenceGateway;
use super::scheduler::{Scheduler, SchedulerGate};
use super::typing::{DEFAULT_MS_PER_CHAR, TypingAnimation};
use crate::domain::calculator::{CalcEvent, Calculator, Key, Operator};
use crate::domain::effects::Effect;
use crate::domain::engine::NarrativeEngine;
use crate::domain::gesture::{Gesture, GestureResolver, GestureSymbol};
use crate::domain::intents::{Intent, IntentOutcome};
use crate::domain::projection::VisualProjection;
use crate::domain::state::EngineState;

const HEARTBEAT_MS: i64 = 1_000;
const BROKEN_MINUS_PULSE_MS: u32 = 60;
const BROKEN_MINUS_AMPLITUDE: u8 = 80;

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionPorts {
    /// UI callbacks.
    pub presenter: Arc<dyn PresentationPort>,
    /// OS capabilities.
    pub capabilities: Arc<dyn CapabilityPort>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Persisted key space.
    pub store: Arc<dyn KeyValueStore>,
}

/// What the outside world can read of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    /// Calculator display.
    pub display: String,
    /// Visible part of the conversation message.
    pub message: String,
    /// Whether the message is still being typed.
    pub is_typing: bool,
    /// Whether the calculator is talking.
    pub in_conversation: bool,
    /// Current step.
    pub step: StepId,
    /// Whether the calculator is muted.
    pub muted: bool,
    /// Visual state.
    pub visual: VisualProjection,
    /// Public state of the active mini-game, `null` when idle.
    pub mini_game: serde_json::Value,
    /// Seconds left on the step countdown.
    pub countdown: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    step: StepId,
    remaining: u32,
    next_beat: DateTime<Utc>,
}

/// One narrative calculator driven in time.
pub struct Session {
    engine: NarrativeEngine,
    scheduler: Scheduler,
    gestures: GestureResolver,
    calculator: Calculator,
    typing: TypingAnimation,
    supervisor: MiniGameSupervisor,
    countdown: Option<Countdown>,
    heartbeat_at: Option<DateTime<Utc>>,
    halted_at: Option<DateTime<Utc>>,
    last_snapshot: serde_json::Value,
    gateway: PersistenceGateway,
    presenter: Arc<dyn PresentationPort>,
    capabilities: Arc<dyn CapabilityPort>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn DeterministicRng>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("scheduler", &self.scheduler)
            .field("supervisor", &self.supervisor)
            .field("countdown", &self.countdown)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates an idle session. Call `start` before anything else.
    #[must_use]
    pub fn new(graph: Arc<StepGraph>, ports: SessionPorts, rng: Box<dyn DeterministicRng>) -> Self {
        let gateway = PersistenceGateway::new(ports.store, Arc::clone(&graph));
        Self {
            engine: NarrativeEngine::new(graph, EngineState::default()),
            scheduler: Scheduler::default(),
            gestures: GestureResolver::default(),
            calculator: Calculator::default(),
            typing: TypingAnimation::new(DEFAULT_MS_PER_CHAR),
            supervisor: MiniGameSupervisor::default(),
            countdown: None,
            heartbeat_at: None,
            halted_at: None,
            last_snapshot: serde_json::Value::Null,
            gateway,
            presenter: ports.presenter,
            capabilities: ports.capabilities,
            clock: ports.clock,
            rng,
        }
    }

    /// Sets the typing speed.
    #[must_use]
    pub fn with_typing_speed(mut self, ms_per_char: u64) -> Self {
        self.typing = TypingAnimation::new(ms_per_char);
        self
    }

    /// Sets the mini-game supervisor, e.g. one with a custom word oracle.
    #[must_use]
    pub fn with_supervisor(mut self, supervisor: MiniGameSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Engine state, read-only.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        self.engine.state()
    }

    /// Loads persisted progress and presents the resumed step.
    ///
    /// A store that cannot be read starts a fresh calculator.
    #[instrument(skip(self))]
    pub async fn start(&mut self) {
        let now = self.clock.now();
        let state = match self.gateway.load(now).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "could not load progress, starting fresh");
                EngineState::default()
            }
        };
        info!(
            step = state.current_step,
            in_conversation = state.in_conversation,
            muted = state.is_muted,
            "session started"
        );
        self.engine.replace_state(state);
        self.clear_runtime();
        self.heartbeat_at = Some(now + Duration::milliseconds(HEARTBEAT_MS));
        self.publish_visual(&self.engine.projection());
        self.dispatch(Intent::Resume).await;
    }

    /// Handles a press of the button labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownButton` for a label the calculator does
    /// not have.
    #[instrument(skip(self))]
    pub async fn press(&mut self, label: &str) -> Result<SessionView, DomainError> {
        let key = Key::parse(label)?;
        let now = self.clock.now();

        if self.engine.state().dark_buttons.contains(label) {
            debug!(label, "dark button ignored");
            return Ok(self.view());
        }
        if self.supervisor.is_active() {
            let input = MiniGameInput::ButtonClick {
                label: label.to_owned(),
            };
            let outcome = self.supervisor.input(&input, now, self.rng.as_mut());
            self.finish_mini_game_input(outcome).await;
            return Ok(self.view());
        }

        match key {
            Key::Operator(Operator::Add) => self.gesture(GestureSymbol::Plus, key, now).await,
            Key::Operator(Operator::Subtract) => {
                if self.engine.state().minus_broken {
                    debug!("broken minus swallowed a press");
                    self.capabilities
                        .play_haptic_pulse(BROKEN_MINUS_PULSE_MS, BROKEN_MINUS_AMPLITUDE)
                        .await;
                } else {
                    self.gesture(GestureSymbol::Minus, key, now).await;
                }
            }
            Key::Equals => {
                self.gestures.press(GestureSymbol::Equals, now);
                if let CalcEvent::Evaluated(result) = self.calculator.press(key) {
                    debug!(result = result.display(), "calculation completed");
                    self.dispatch(Intent::CalculationCompleted).await;
                }
            }
            _ => {
                self.calculator.press(key);
            }
        }
        Ok(self.view())
    }

    /// Advances every ticker to the clock's current time.
    pub async fn tick(&mut self) {
        let now = self.clock.now();
        let muted = self.engine.state().is_muted;

        if !muted {
            if let Some(frame) = self.typing.advance(now) {
                self.presenter
                    .on_message_changed(&frame.text, frame.is_typing);
            }
            self.screen_time_beat(now).await;
            self.countdown_beat(now).await;
            if self.supervisor.is_active() {
                let outcome = self.supervisor.tick(now, self.rng.as_mut());
                self.finish_mini_game_input(outcome).await;
            }
        }

        let gate = SchedulerGate {
            typing_complete: self.typing.is_complete(),
            muted: self.engine.state().is_muted,
            mini_game_active: self.supervisor.is_active()
                || self.engine.state().active_mini_game.is_some(),
        };
        for task in self.scheduler.poll(gate, now) {
            debug!(id = %task.id, from_step = task.from_step, to_step = task.to_step, "transition due");
            self.dispatch(Intent::CommitScheduled {
                from_step: task.from_step,
                to_step: task.to_step,
            })
            .await;
        }

        self.dispatch(Intent::Tick).await;
    }

    /// Mutes or unmutes the calculator.
    #[instrument(skip(self))]
    pub async fn set_muted(&mut self, muted: bool) -> SessionView {
        let intent = if muted { Intent::Mute } else { Intent::Unmute };
        self.dispatch(intent).await;
        self.view()
    }

    /// Routes input to the active mini-game.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no mini-game is active.
    #[instrument(skip(self))]
    pub async fn mini_game_input(
        &mut self,
        input: MiniGameInput,
    ) -> Result<SessionView, DomainError> {
        if !self.supervisor.is_active() {
            return Err(DomainError::Validation("no mini-game is active".to_owned()));
        }
        let now = self.clock.now();
        let outcome = self.supervisor.input(&input, now, self.rng.as_mut());
        self.finish_mini_game_input(outcome).await;
        Ok(self.view())
    }

    /// Forgets all progress.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the persisted keys could not be cleared.
    #[instrument(skip(self))]
    pub async fn reset(&mut self) -> Result<SessionView, DomainError> {
        self.gateway.reset().await?;
        self.engine.replace_state(EngineState::default());
        self.clear_runtime();
        self.heartbeat_at = Some(self.clock.now() + Duration::milliseconds(HEARTBEAT_MS));
        self.presenter.on_message_changed("", false);
        self.publish_visual(&self.engine.projection());
        self.publish_mini_game();
        Ok(self.view())
    }

    /// Saves, then reloads as if the app had been closed and reopened.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the state could not be saved.
    #[instrument(skip(self))]
    pub async fn restart(&mut self) -> Result<SessionView, DomainError> {
        self.gateway.save(self.engine.state()).await?;
        self.start().await;
        Ok(self.view())
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let state = self.engine.state();
        SessionView {
            display: self.calculator.display().to_owned(),
            message: self.typing.visible(),
            is_typing: !self.typing.is_complete(),
            in_conversation: state.in_conversation,
            step: state.current_step,
            muted: state.is_muted,
            visual: self.engine.projection(),
            mini_game: self.supervisor.snapshot(),
            countdown: self.countdown.map(|c| c.remaining),
        }
    }

    // --- internals ---------------------------------------------------------

    fn clear_runtime(&mut self) {
        self.scheduler.cancel_all();
        self.scheduler.resume();
        self.supervisor.stop();
        self.typing.cancel();
        self.calculator.clear();
        self.gestures.reset();
        self.countdown = None;
        self.halted_at = None;
    }

    async fn gesture(&mut self, symbol: GestureSymbol, key: Key, now: DateTime<Utc>) {
        let state = self.engine.state();
        let conversing = state.in_conversation && !state.is_muted;
        match self.gestures.press(symbol, now) {
            Gesture::DoublePress(symbol) if conversing => {
                let input = self.calculator.pending_input();
                self.calculator.clear();
                let intent = match symbol {
                    GestureSymbol::Minus => Intent::Decline { input },
                    GestureSymbol::Plus | GestureSymbol::Equals => Intent::Agree { input },
                };
                self.dispatch(intent).await;
            }
            _ => {
                self.calculator.press(key);
            }
        }
    }

    async fn finish_mini_game_input(&mut self, outcome: Option<MiniGameOutcome>) {
        self.publish_mini_game();
        if let Some(outcome) = outcome {
            self.dispatch(Intent::MiniGameFinished(outcome)).await;
        }
    }

    async fn screen_time_beat(&mut self, now: DateTime<Utc>) {
        let Some(at) = self.heartbeat_at else {
            self.heartbeat_at = Some(now + Duration::milliseconds(HEARTBEAT_MS));
            return;
        };
        if now < at {
            return;
        }
        let beats = (now - at).num_milliseconds() / HEARTBEAT_MS + 1;
        self.heartbeat_at = Some(at + Duration::milliseconds(beats * HEARTBEAT_MS));
        let millis = u64::try_from(beats * HEARTBEAT_MS).unwrap_or(0);
        self.dispatch(Intent::ScreenTimeElapsed { millis }).await;
    }

    async fn countdown_beat(&mut self, now: DateTime<Utc>) {
        let Some(mut countdown) = self.countdown else {
            return;
        };
        let state = self.engine.state();
        if !state.in_conversation
            || state.current_step != countdown.step
            || state.has_pending_transition()
        {
            debug!(step = countdown.step, "countdown abandoned");
            self.countdown = None;
            return;
        }
        if now < countdown.next_beat {
            return;
        }
        countdown.remaining = countdown.remaining.saturating_sub(1);
        countdown.next_beat += Duration::milliseconds(HEARTBEAT_MS);
        self.presenter.on_visual_effect(
            "countdown",
            &serde_json::json!({ "step": countdown.step, "remaining": countdown.remaining }),
        );
        if countdown.remaining == 0 {
            self.countdown = None;
            self.dispatch(Intent::CountdownElapsed {
                step: countdown.step,
            })
            .await;
        } else {
            self.countdown = Some(countdown);
        }
    }

    async fn dispatch(&mut self, intent: Intent) {
        let mut queue = VecDeque::from([intent]);
        while let Some(intent) = queue.pop_front() {
            let now = self.clock.now();
            if self.engine.handle(intent, now) != IntentOutcome::Accepted {
                continue;
            }
            for effect in self.engine.take_effects() {
                self.apply(effect, now, &mut queue).await;
            }
        }
    }

    async fn apply(&mut self, effect: Effect, now: DateTime<Utc>, queue: &mut VecDeque<Intent>) {
        match effect {
            Effect::ShowMessage { text } => {
                let frame = self.typing.start(&text, now);
                self.presenter
                    .on_message_changed(&frame.text, frame.is_typing);
            }
            Effect::ClearMessage => {
                self.typing.cancel();
                self.presenter.on_message_changed("", false);
            }
            Effect::Schedule(request) => {
                self.scheduler.schedule(&request, now);
            }
            Effect::CancelSchedules => {
                let dropped = self.scheduler.cancel_all();
                debug!(dropped, "schedules cancelled");
                self.countdown = None;
            }
            Effect::StartMiniGame(spec) => {
                let lit = self.lit_buttons();
                match self.supervisor.start(&spec, &lit, now, self.rng.as_mut()) {
                    Ok(()) => self.publish_mini_game(),
                    Err(e) => warn!(error = %e, "mini-game not started"),
                }
            }
            Effect::StopMiniGame => {
                self.supervisor.stop();
                self.publish_mini_game();
            }
            Effect::StartCountdown { step, seconds } => {
                self.countdown = Some(Countdown {
                    step,
                    remaining: seconds,
                    next_beat: now + Duration::milliseconds(HEARTBEAT_MS),
                });
                self.presenter.on_visual_effect(
                    "countdown",
                    &serde_json::json!({ "step": step, "remaining": seconds }),
                );
            }
            Effect::HaltTickers => {
                self.typing.cancel();
                self.scheduler.suspend(now);
                self.supervisor.pause(now);
                self.halted_at = Some(now);
            }
            Effect::ResumeTickers => {
                self.scheduler.resume();
                self.supervisor.resume(now);
                if let Some(halted_at) = self.halted_at.take() {
                    let paused = now - halted_at;
                    if let Some(countdown) = self.countdown.as_mut() {
                        countdown.next_beat += paused;
                    }
                    self.heartbeat_at = self.heartbeat_at.map(|at| at + paused);
                }
            }
            Effect::RequestPermission { kind } => {
                let granted = self.capabilities.request_permission(kind).await;
                info!(?kind, granted, "permission resolved");
                queue.push_back(Intent::PermissionResolved { kind, granted });
            }
            Effect::OpenExternalLink { url } => {
                if let Err(e) = self.capabilities.open_external_link(&url).await {
                    warn!(error = %e, url, "could not open link");
                }
            }
            Effect::WriteDisclosureFile => {
                if let Err(e) = self.capabilities.write_disclosure_file().await {
                    warn!(error = %e, "could not write disclosure file");
                }
            }
            Effect::ScheduleNotification { minutes } => {
                let delay = Duration::minutes(i64::from(minutes));
                if let Err(e) = self.capabilities.schedule_os_notification(delay).await {
                    warn!(error = %e, minutes, "could not schedule notification");
                }
            }
            Effect::HapticPulse {
                duration_ms,
                amplitude,
            } => {
                self.capabilities
                    .play_haptic_pulse(duration_ms, amplitude)
                    .await;
            }
            Effect::VisualChanged(projection) => self.publish_visual(&projection),
            Effect::ConversationEnded => {
                self.gestures.reset();
                self.countdown = None;
            }
            Effect::Persist => {
                if let Err(e) = self.gateway.save(self.engine.state()).await {
                    warn!(error = %e, "could not persist progress");
                }
            }
        }
    }

    fn lit_buttons(&self) -> Vec<String> {
        let dark = &self.engine.state().dark_buttons;
        TARGET_BUTTONS
            .iter()
            .filter(|b| !dark.contains(**b))
            .map(|b| (*b).to_owned())
            .collect()
    }

    fn publish_visual(&self, projection: &VisualProjection) {
        match serde_json::to_value(projection) {
            Ok(params) => self.presenter.on_visual_effect("visual", &params),
            Err(e) => warn!(error = %e, "visual projection not serializable"),
        }
    }

    fn publish_mini_game(&mut self) {
        let snapshot = self.supervisor.snapshot();
        if snapshot != self.last_snapshot {
            self.presenter.on_mini_game_state_changed(&snapshot);
            self.last_snapshot = snapshot;
        }
    }
}
