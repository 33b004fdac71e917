//! # tradedesk-notify
//!
//! Realtime notification delivery subsystem for TradeDesk. Provides:
//!
//! - WebSocket transport with connection-time authentication, channel
//!   subscription, and bounded automatic reconnection
//! - Normalization of heterogeneous server events into one canonical
//!   notification record with per-kind defaults
//! - Listener registry with panic-isolated fan-out
//! - Background push channel with native display and server-synced
//!   subscription lifecycle
//! - Polling fallback feeding the same normalizer/dispatch path
//!
//! All delivery failures degrade to "notifications temporarily
//! unavailable"; nothing in this crate surfaces an error to the host
//! application beyond the absence of notifications.

pub mod api;
pub mod capability;
pub mod context;
pub mod dispatch;
pub mod message;
pub mod normalize;
pub mod poll;
pub mod push;
pub mod record;
pub mod transport;

pub use api::ApiClient;
pub use capability::{CapabilityProbe, NotifyPlatform, PermissionState};
pub use context::NotifyContext;
pub use dispatch::{ListenerGuard, NotificationHub};
pub use poll::PollingFallback;
pub use push::BackgroundDelivery;
pub use record::{NotificationKind, NotificationRecord, Priority};
pub use transport::{RealtimeTransport, TransportState};
