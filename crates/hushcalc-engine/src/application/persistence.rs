//! Persistence gateway.
//!
//! Maps `EngineState` onto the flat key space of a `KeyValueStore` and back.
//! Loading is where crash recovery happens: the saved step is moved onto a
//! safe step and everything transient is dropped, so a restored session
//! always waits for user input.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hushcalc_core::error::DomainError;
use hushcalc_core::repository::{KeySpace, KeyValueStore, StoredValue};
use hushcalc_story::StepGraph;
use hushcalc_story::step::StepId;
use tracing::{debug, info};

use crate::domain::state::EngineState;
use crate::domain::timeout::TimeoutController;

/// Persisted key names.
pub mod keys {
    pub const EQUALS_COUNT: &str = "equalsCount";
    pub const CONVERSATION_STEP: &str = "conversationStep";
    pub const IN_CONVERSATION: &str = "inConversation";
    pub const LAST_MESSAGE: &str = "lastMessage";
    pub const AWAITING_NUMBER: &str = "awaitingNumber";
    pub const EXPECTED_NUMBER: &str = "expectedNumber";
    pub const AWAITING_CHOICE: &str = "awaitingChoice";
    pub const VALID_CHOICES: &str = "validChoices";
    pub const TIMEOUT_UNTIL: &str = "timeoutUntil";
    pub const SILENT_UNTIL: &str = "silentUntil";
    pub const MUTED: &str = "muted";
    pub const INVERTED_COLORS: &str = "invertedColors";
    pub const MINUS_DAMAGED: &str = "minusDamaged";
    pub const MINUS_BROKEN: &str = "minusBroken";
    pub const NEEDS_RESTART: &str = "needsRestart";
    pub const TOTAL_SCREEN_TIME_MS: &str = "totalScreenTimeMs";
    pub const TOTAL_CALCULATIONS: &str = "totalCalculations";
    pub const DARK_BUTTONS: &str = "darkButtons";
    /// Step the calculator was silenced at, `-1` when not muted. A muted
    /// calculator resumes from this step rather than `conversationStep`.
    pub const PAUSED_AT_STEP: &str = "pausedAtStep";
    pub const SCRAMBLE_PUNISHMENT_UNTIL: &str = "scramblePunishmentUntil";
    pub const SCRAMBLE_TIMEOUT_COUNT: &str = "scrambleTimeoutCount";
    pub const TERMS_ACCEPTED: &str = "termsAccepted";
}

/// Reads and writes `EngineState` through a `KeyValueStore`.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    graph: Arc<StepGraph>,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway").finish_non_exhaustive()
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> StoredValue {
    StoredValue::Int(value.map_or(0, |t| t.timestamp_millis()))
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> StoredValue {
    StoredValue::Text(
        items
            .into_iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

struct Reader<'a>(&'a KeySpace);

impl Reader<'_> {
    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(StoredValue::as_bool).unwrap_or(false)
    }

    fn int(&self, key: &str) -> i64 {
        self.0.get(key).and_then(StoredValue::as_int).unwrap_or(0)
    }

    fn text(&self, key: &str) -> String {
        self.0
            .get(key)
            .and_then(StoredValue::as_text)
            .unwrap_or_default()
            .to_owned()
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.text(key)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.int(key) {
            ms if ms > 0 => DateTime::from_timestamp_millis(ms),
            _ => None,
        }
    }

    fn step(&self, key: &str) -> Option<StepId> {
        StepId::try_from(self.int(key)).ok()
    }

    fn stored_step(&self, key: &str) -> Option<StepId> {
        self.0
            .get(key)
            .and_then(StoredValue::as_int)
            .and_then(|v| StepId::try_from(v).ok())
    }
}

impl PersistenceGateway {
    /// Creates a gateway over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, graph: Arc<StepGraph>) -> Self {
        Self { store, graph }
    }

    /// Encodes `state` as a key space.
    #[must_use]
    pub fn encode(state: &EngineState) -> KeySpace {
        let mut out = KeySpace::new();
        let mut put = |key: &str, value: StoredValue| {
            out.insert(key.to_owned(), value);
        };
        put(keys::EQUALS_COUNT, StoredValue::Int(i64::from(state.equals_count)));
        put(
            keys::CONVERSATION_STEP,
            StoredValue::Int(i64::from(state.current_step)),
        );
        put(keys::IN_CONVERSATION, StoredValue::Bool(state.in_conversation));
        put(keys::LAST_MESSAGE, StoredValue::Text(state.last_message.clone()));
        put(keys::AWAITING_NUMBER, StoredValue::Bool(state.awaiting_number));
        put(
            keys::EXPECTED_NUMBER,
            StoredValue::Text(state.expected_number.clone()),
        );
        put(keys::AWAITING_CHOICE, StoredValue::Bool(state.awaiting_choice));
        put(keys::VALID_CHOICES, join(&state.valid_choices));
        put(keys::TIMEOUT_UNTIL, timestamp(state.timeout_until));
        put(keys::SILENT_UNTIL, timestamp(state.silent_until));
        put(keys::MUTED, StoredValue::Bool(state.is_muted));
        put(keys::INVERTED_COLORS, StoredValue::Bool(state.inverted_colors));
        put(keys::MINUS_DAMAGED, StoredValue::Bool(state.minus_damaged));
        put(keys::MINUS_BROKEN, StoredValue::Bool(state.minus_broken));
        put(keys::NEEDS_RESTART, StoredValue::Bool(state.needs_restart));
        put(
            keys::TOTAL_SCREEN_TIME_MS,
            StoredValue::Int(i64::try_from(state.total_screen_time_ms).unwrap_or(i64::MAX)),
        );
        put(
            keys::TOTAL_CALCULATIONS,
            StoredValue::Int(i64::try_from(state.total_calculations).unwrap_or(i64::MAX)),
        );
        put(keys::DARK_BUTTONS, join(&state.dark_buttons));
        put(
            keys::PAUSED_AT_STEP,
            StoredValue::Int(state.paused_at_step.map_or(-1, i64::from)),
        );
        put(
            keys::SCRAMBLE_PUNISHMENT_UNTIL,
            timestamp(state.scramble_punishment_until),
        );
        put(
            keys::SCRAMBLE_TIMEOUT_COUNT,
            StoredValue::Int(i64::from(state.scramble_timeout_count)),
        );
        put(keys::TERMS_ACCEPTED, StoredValue::Bool(state.terms_accepted));
        out
    }

    /// Decodes a key space into a resumable state at `now`.
    ///
    /// Missing keys take their defaults. The restored step is the safe step
    /// for the saved one; awaiting flags come from its configuration, lapsed
    /// windows and everything transient are dropped.
    #[must_use]
    pub fn decode(&self, entries: &KeySpace, now: DateTime<Utc>) -> EngineState {
        let r = Reader(entries);
        let mut state = EngineState {
            equals_count: u32::try_from(r.int(keys::EQUALS_COUNT)).unwrap_or(0),
            total_calculations: u64::try_from(r.int(keys::TOTAL_CALCULATIONS)).unwrap_or(0),
            total_screen_time_ms: u64::try_from(r.int(keys::TOTAL_SCREEN_TIME_MS)).unwrap_or(0),
            in_conversation: r.flag(keys::IN_CONVERSATION),
            last_message: r.text(keys::LAST_MESSAGE),
            timeout_until: r.timestamp(keys::TIMEOUT_UNTIL),
            silent_until: r.timestamp(keys::SILENT_UNTIL),
            scramble_punishment_until: r.timestamp(keys::SCRAMBLE_PUNISHMENT_UNTIL),
            scramble_timeout_count: u32::try_from(r.int(keys::SCRAMBLE_TIMEOUT_COUNT))
                .unwrap_or(0),
            is_muted: r.flag(keys::MUTED),
            inverted_colors: r.flag(keys::INVERTED_COLORS),
            minus_damaged: r.flag(keys::MINUS_DAMAGED),
            minus_broken: r.flag(keys::MINUS_BROKEN),
            needs_restart: r.flag(keys::NEEDS_RESTART),
            terms_accepted: r.flag(keys::TERMS_ACCEPTED),
            dark_buttons: r.list(keys::DARK_BUTTONS).into_iter().collect(),
            ..EngineState::default()
        };

        let conversation_step = r.step(keys::CONVERSATION_STEP).unwrap_or(0);
        let mut saved = if state.is_muted && state.in_conversation {
            r.stored_step(keys::PAUSED_AT_STEP)
                .unwrap_or(conversation_step)
        } else {
            conversation_step
        };
        if state.needs_restart {
            let next = self.graph.get(saved).next_step_on_success;
            info!(from = saved, to = next, "restart requirement fulfilled");
            saved = next;
            state.needs_restart = false;
        }
        let step = self.graph.resume_policy().resume_step(saved);
        if step != saved {
            debug!(saved, resumed = step, "resuming at safe step");
        }
        state.enter(step, self.graph.get(step));
        TimeoutController::clear_expired(&mut state, now);
        state.active_mini_game = None;

        if state.in_conversation {
            state.last_message.clone_from(&self.graph.get(step).prompt_message);
        }
        if state.is_muted && state.in_conversation {
            state.paused_at_step = Some(step);
        }
        state
    }

    /// Writes `state`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn save(&self, state: &EngineState) -> Result<(), DomainError> {
        self.store.put_all(&Self::encode(state)).await
    }

    /// Loads the resumable state.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<EngineState, DomainError> {
        let entries = self.store.load_all().await?;
        Ok(self.decode(&entries, now))
    }

    /// Clears every persisted key.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn reset(&self) -> Result<(), DomainError> {
        info!("persisted progress cleared");
        self.store.clear().await
    }
}
