//! Headless implementations of the presentation and capability ports.
//!
//! The server has no screen and no device, so both ports only log. Every
//! permission request is refused, which sends the story down its decline
//! paths.

use async_trait::async_trait;
use chrono::Duration;
use hushcalc_core::error::DomainError;
use hushcalc_core::ports::{CapabilityPort, PermissionKind, PresentationPort};
use tracing::{debug, info};

/// Logs what would have been drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl PresentationPort for TracingPresenter {
    fn on_message_changed(&self, text: &str, is_typing: bool) {
        if is_typing {
            debug!(text, "typing");
        } else if !text.is_empty() {
            info!(text, "message shown");
        }
    }

    fn on_visual_effect(&self, kind: &str, params: &serde_json::Value) {
        info!(kind, %params, "visual effect");
    }

    fn on_mini_game_state_changed(&self, payload: &serde_json::Value) {
        debug!(%payload, "mini-game state");
    }
}

/// Capability port for a process without a device behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessCapabilities;

#[async_trait]
impl CapabilityPort for HeadlessCapabilities {
    async fn request_permission(&self, kind: PermissionKind) -> bool {
        info!(?kind, "permission requested, denied");
        false
    }

    async fn open_external_link(&self, url: &str) -> Result<(), DomainError> {
        info!(url, "external link");
        Ok(())
    }

    async fn write_disclosure_file(&self) -> Result<(), DomainError> {
        info!("disclosure file requested");
        Ok(())
    }

    async fn schedule_os_notification(&self, delay: Duration) -> Result<(), DomainError> {
        info!(delay_secs = delay.num_seconds(), "notification scheduled");
        Ok(())
    }

    async fn play_haptic_pulse(&self, duration_ms: u32, amplitude: u8) {
        debug!(duration_ms, amplitude, "haptic pulse");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headless_capabilities_deny_every_permission() {
        let capabilities = HeadlessCapabilities;

        assert!(!capabilities.request_permission(PermissionKind::Notifications).await);
        assert!(!capabilities.request_permission(PermissionKind::Camera).await);
    }

    #[tokio::test]
    async fn test_headless_side_effects_succeed() {
        let capabilities = HeadlessCapabilities;

        assert!(capabilities.open_external_link("https://example.org").await.is_ok());
        assert!(capabilities.write_disclosure_file().await.is_ok());
        assert!(
            capabilities
                .schedule_os_notification(Duration::seconds(60))
                .await
                .is_ok()
        );
    }
}
