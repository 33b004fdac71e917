//! Capability probe for the native notification surface.
//!
//! Advisory, never fatal: every method degrades to a safe false/empty
//! value in environments lacking the capability (headless CI, server
//! contexts) instead of failing.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tradedesk_core::config::api::ApiConfig;
use tradedesk_core::config::notifications::NotificationsConfig;
use tradedesk_core::AppResult;

/// User consent state for displaying notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Consent granted.
    Granted,
    /// Consent denied.
    Denied,
    /// Not yet asked.
    Default,
}

impl PermissionState {
    /// Whether display is currently permitted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Platform access behind a trait so tests can substitute a mock and so
/// headless environments degrade instead of erroring.
#[async_trait]
pub trait NotifyPlatform: Send + Sync + std::fmt::Debug {
    /// Whether an interactive session (a display surface a user actually
    /// sees) is present.
    fn is_interactive(&self) -> bool;

    /// Whether the notification display capability is compiled in and
    /// reachable.
    fn supports_display(&self) -> bool;

    /// Ask the platform for display consent. Called once per
    /// [`CapabilityProbe::request_permission`] invocation.
    async fn request_permission(&self) -> PermissionState;

    /// Display one notification.
    async fn show(&self, title: &str, body: &str) -> AppResult<()>;
}

/// Production platform targeting the desktop notification surface.
#[derive(Debug, Default)]
pub struct DesktopPlatform;

#[async_trait]
impl NotifyPlatform for DesktopPlatform {
    fn is_interactive(&self) -> bool {
        #[cfg(target_os = "linux")]
        {
            std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
        }
        #[cfg(not(target_os = "linux"))]
        {
            true
        }
    }

    fn supports_display(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> PermissionState {
        // Desktop surfaces have no consent dialog; reachability of the
        // display surface stands in for consent.
        if self.is_interactive() {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn show(&self, title: &str, body: &str) -> AppResult<()> {
        let title = title.to_string();
        let body = body.to_string();

        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .appname("TradeDesk")
                .show()
                .map(|_| ())
                .map_err(|e| {
                    tradedesk_core::AppError::unsupported(format!(
                        "Native notification display failed: {e}"
                    ))
                })
        })
        .await
        .map_err(|e| tradedesk_core::AppError::internal(format!("Display task panicked: {e}")))?
    }
}

/// Probes whether background notification delivery is available in this
/// runtime and tracks the user consent state.
#[derive(Debug)]
pub struct CapabilityProbe {
    /// Platform access.
    platform: Arc<dyn NotifyPlatform>,
    /// Feature flag from configuration.
    push_enabled: bool,
    /// Whether the backend is reached over a secure transport.
    secure: bool,
    /// Current consent state.
    permission: Mutex<PermissionState>,
}

impl CapabilityProbe {
    /// Create a probe from configuration.
    pub fn new(
        platform: Arc<dyn NotifyPlatform>,
        notifications: &NotificationsConfig,
        api: &ApiConfig,
    ) -> Self {
        Self {
            platform,
            push_enabled: notifications.push_enabled,
            secure: api.is_secure(),
            permission: Mutex::new(PermissionState::Default),
        }
    }

    /// Access the underlying platform.
    pub fn platform(&self) -> &Arc<dyn NotifyPlatform> {
        &self.platform
    }

    /// True iff background notification delivery can work here: an
    /// interactive session, the feature flag on, the display capability
    /// present, and a secure backend transport. Safe to call anywhere.
    pub fn is_supported(&self) -> bool {
        self.push_enabled
            && self.secure
            && self.platform.is_interactive()
            && self.platform.supports_display()
    }

    /// Current consent state. Exactly one of granted/denied/default.
    pub fn permission_state(&self) -> PermissionState {
        *self
            .permission
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Prompt the platform once and record the outcome. Returns whether
    /// consent was granted; false (never an error) where the capability
    /// is missing.
    pub async fn request_permission(&self) -> bool {
        if !self.is_supported() {
            debug!("Permission request skipped: environment unsupported");
            return false;
        }

        let state = self.platform.request_permission().await;
        let mut guard = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        *guard = state;
        state.is_granted()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockPlatform;
    use super::*;
    use std::sync::atomic::Ordering;

    fn probe_with(platform: MockPlatform) -> CapabilityProbe {
        CapabilityProbe::new(
            Arc::new(platform),
            &NotificationsConfig::default(),
            &ApiConfig::default(),
        )
    }

    #[test]
    fn unsupported_environment_degrades_to_false() {
        let probe = probe_with(MockPlatform::default());
        assert!(!probe.is_supported());
        assert_eq!(probe.permission_state(), PermissionState::Default);
    }

    #[test]
    fn feature_flag_disables_support() {
        let config = NotificationsConfig {
            push_enabled: false,
            ..Default::default()
        };
        let probe = CapabilityProbe::new(
            Arc::new(MockPlatform::supportive()),
            &config,
            &ApiConfig::default(),
        );
        assert!(!probe.is_supported());
    }

    #[tokio::test]
    async fn request_permission_records_grant() {
        let probe = probe_with(MockPlatform::supportive());
        assert!(probe.request_permission().await);
        assert_eq!(probe.permission_state(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn request_permission_records_denial() {
        let platform = MockPlatform::supportive();
        platform.grant.store(false, Ordering::SeqCst);
        let probe = probe_with(platform);
        assert!(!probe.request_permission().await);
        assert_eq!(probe.permission_state(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn request_permission_on_unsupported_env_never_prompts() {
        let probe = probe_with(MockPlatform::default());
        assert!(!probe.request_permission().await);
        assert_eq!(probe.permission_state(), PermissionState::Default);
    }
}
