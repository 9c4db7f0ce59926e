//! Ports towards collaborators outside the narrative core.
//!
//! The presentation layer only consumes what the engine emits; the operating
//! system capabilities are requested through `CapabilityPort` and may be
//! refused at any time.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A runtime permission the story may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Posting notifications.
    Notifications,
    /// Using the camera.
    Camera,
}

/// Outbound port consumed by the UI layer.
pub trait PresentationPort: Send + Sync {
    /// The visible conversation text changed. `is_typing` is true while the
    /// typing animation is still revealing characters.
    fn on_message_changed(&self, text: &str, is_typing: bool);

    /// A visual effect should be rendered.
    fn on_visual_effect(&self, kind: &str, params: &serde_json::Value);

    /// The active mini-game's public state changed.
    fn on_mini_game_state_changed(&self, payload: &serde_json::Value);
}

/// Operating-system capabilities the story reaches for.
#[async_trait]
pub trait CapabilityPort: Send + Sync {
    /// Ask the user for a runtime permission. Returns whether it was granted.
    async fn request_permission(&self, kind: PermissionKind) -> bool;

    /// Open a URL in an external browser.
    async fn open_external_link(&self, url: &str) -> Result<(), DomainError>;

    /// Write the disclosure letter to shared storage.
    async fn write_disclosure_file(&self) -> Result<(), DomainError>;

    /// Schedule a notification to be posted after `delay`.
    async fn schedule_os_notification(&self, delay: Duration) -> Result<(), DomainError>;

    /// Vibrate the device.
    async fn play_haptic_pulse(&self, duration_ms: u32, amplitude: u8);
}
