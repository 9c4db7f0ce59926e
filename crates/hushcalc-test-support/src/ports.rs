//! Recording ports — capture what the session pushes outward.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use hushcalc_core::error::DomainError;
use hushcalc_core::ports::{CapabilityPort, PermissionKind, PresentationPort};

/// A presentation port that records every callback.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    messages: Mutex<Vec<(String, bool)>>,
    effects: Mutex<Vec<(String, serde_json::Value)>>,
    mini_games: Mutex<Vec<serde_json::Value>>,
}

impl RecordingPresenter {
    /// All `(text, is_typing)` frames in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<(String, bool)> {
        self.messages.lock().unwrap().clone()
    }

    /// The most recent frame, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_message(&self) -> Option<(String, bool)> {
        self.messages.lock().unwrap().last().cloned()
    }

    /// All visual effects in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn visual_effects(&self) -> Vec<(String, serde_json::Value)> {
        self.effects.lock().unwrap().clone()
    }

    /// All mini-game payloads in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn mini_game_payloads(&self) -> Vec<serde_json::Value> {
        self.mini_games.lock().unwrap().clone()
    }
}

impl PresentationPort for RecordingPresenter {
    fn on_message_changed(&self, text: &str, is_typing: bool) {
        self.messages
            .lock()
            .unwrap()
            .push((text.to_owned(), is_typing));
    }

    fn on_visual_effect(&self, kind: &str, params: &serde_json::Value) {
        self.effects
            .lock()
            .unwrap()
            .push((kind.to_owned(), params.clone()));
    }

    fn on_mini_game_state_changed(&self, payload: &serde_json::Value) {
        self.mini_games.lock().unwrap().push(payload.clone());
    }
}

/// One recorded capability request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCapability {
    /// A permission prompt and the canned answer.
    Permission(PermissionKind, bool),
    /// A link that was opened.
    Link(String),
    /// The disclosure file was written.
    DisclosureFile,
    /// A notification was scheduled.
    Notification(Duration),
    /// A haptic pulse.
    Haptic(u32, u8),
}

/// A capability port that answers permission prompts with a fixed result and
/// records every call.
#[derive(Debug)]
pub struct RecordingCapabilities {
    grant: bool,
    calls: Mutex<Vec<RecordedCapability>>,
}

impl RecordingCapabilities {
    /// Create a port that grants (or denies) every permission.
    #[must_use]
    pub fn new(grant: bool) -> Self {
        Self {
            grant,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<RecordedCapability> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityPort for RecordingCapabilities {
    async fn request_permission(&self, kind: PermissionKind) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCapability::Permission(kind, self.grant));
        self.grant
    }

    async fn open_external_link(&self, url: &str) -> Result<(), DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCapability::Link(url.to_owned()));
        Ok(())
    }

    async fn write_disclosure_file(&self) -> Result<(), DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCapability::DisclosureFile);
        Ok(())
    }

    async fn schedule_os_notification(&self, delay: Duration) -> Result<(), DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCapability::Notification(delay));
        Ok(())
    }

    async fn play_haptic_pulse(&self, duration_ms: u32, amplitude: u8) {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCapability::Haptic(duration_ms, amplitude));
    }
}
