//! Notification delivery configuration.

use serde::{Deserialize, Serialize};

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Feature flag: enable background push delivery outright.
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    /// Public key material for the push gateway. Absence disables the
    /// push channel without failing initialization.
    #[serde(default)]
    pub push_public_key: Option<String>,
    /// Whether the realtime transport is the active delivery path. When
    /// false, the polling fallback runs instead.
    #[serde(default = "default_true")]
    pub realtime_enabled: bool,
    /// Polling fallback interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum notifications fetched per polling tick and retained in the
    /// poller's seen-id history.
    #[serde(default = "default_poll_limit")]
    pub poll_history_limit: usize,
    /// Maximum automatic reconnection attempts after a transport drop.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_max_attempts: u32,
    /// Fixed delay between reconnection attempts in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            push_enabled: true,
            push_public_key: None,
            realtime_enabled: true,
            poll_interval_seconds: default_poll_interval(),
            poll_history_limit: default_poll_limit(),
            reconnect_max_attempts: default_reconnect_attempts(),
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_poll_limit() -> usize {
    50
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    3
}
