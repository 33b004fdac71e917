//! Per-session notification context.
//!
//! One `NotifyContext` is constructed at application start and injected
//! into components that need it — the "one instance per page session"
//! semantic without module-level mutable singletons. Only this context
//! decides which delivery path (transport or polling) is active; the two
//! never run concurrently for one session.

use std::sync::Arc;

use tracing::{info, warn};

use tradedesk_core::config::AppConfig;
use tradedesk_core::types::auth::Credentials;
use tradedesk_core::AppResult;

use crate::api::ApiClient;
use crate::capability::{CapabilityProbe, NotifyPlatform};
use crate::dispatch::NotificationHub;
use crate::poll::PollingFallback;
use crate::push::BackgroundDelivery;
use crate::transport::{RealtimeTransport, TransportState};

/// Aggregated notification services for one session.
#[derive(Debug)]
pub struct NotifyContext {
    /// Capability probe.
    probe: Arc<CapabilityProbe>,
    /// REST client (credential holder).
    api: Arc<ApiClient>,
    /// Background delivery channel.
    push: Arc<BackgroundDelivery>,
    /// Dispatch hub.
    hub: Arc<NotificationHub>,
    /// Realtime transport when it is the configured delivery path.
    transport: Option<RealtimeTransport>,
    /// Polling fallback, started only when the transport is absent.
    poller: Arc<PollingFallback>,
}

impl NotifyContext {
    /// Build the context from configuration. The transport is preferred;
    /// polling takes over when realtime is disabled or no websocket URL
    /// can be derived.
    pub fn new(config: &AppConfig, platform: Arc<dyn NotifyPlatform>) -> AppResult<Arc<Self>> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        let probe = Arc::new(CapabilityProbe::new(
            platform,
            &config.notifications,
            &config.api,
        ));
        let push = Arc::new(BackgroundDelivery::new(
            Arc::clone(&probe),
            Arc::clone(&api),
            config.notifications.push_public_key.clone(),
        ));
        let hub = Arc::new(NotificationHub::new(Arc::clone(&api), Arc::clone(&push)));

        let transport = if config.notifications.realtime_enabled {
            match config.api.websocket_url() {
                Ok(url) => Some(RealtimeTransport::new(
                    url,
                    config.notifications.clone(),
                    Arc::clone(&hub),
                )),
                Err(e) => {
                    warn!(error = %e, "Realtime transport unavailable; falling back to polling");
                    None
                }
            }
        } else {
            info!("Realtime transport disabled by configuration; polling fallback active");
            None
        };

        let poller = Arc::new(PollingFallback::new(
            Arc::clone(&api),
            Arc::clone(&hub),
            &config.notifications,
        ));

        Ok(Arc::new(Self {
            probe,
            api,
            push,
            hub,
            transport,
            poller,
        }))
    }

    /// Start the configured delivery path and initialize the background
    /// channel (best-effort).
    pub async fn start(&self) {
        if self.push.initialize().await {
            info!("Background delivery channel initialized");
        }

        match &self.transport {
            Some(transport) => transport.connect(),
            None => self.poller.start(),
        }
    }

    /// Sign-in/sign-out entry point. A credential (re)connects the
    /// active path; `None` disconnects and clears listeners.
    pub fn update_auth(&self, credentials: Option<Credentials>) {
        self.api.set_credentials(credentials.clone());
        match &self.transport {
            Some(transport) => transport.update_auth(credentials),
            None => {
                if credentials.is_none() {
                    self.hub.clear();
                }
            }
        }
    }

    /// Stop every delivery path and release long-lived resources.
    pub fn shutdown(&self) {
        if let Some(transport) = &self.transport {
            transport.disconnect();
        }
        self.poller.disconnect();
    }

    /// The dispatch hub (listener registration, recent fetch,
    /// read-state).
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    /// The capability probe.
    pub fn probe(&self) -> &Arc<CapabilityProbe> {
        &self.probe
    }

    /// The background delivery channel.
    pub fn push(&self) -> &Arc<BackgroundDelivery> {
        &self.push
    }

    /// Transport state, when the transport is the active path.
    pub fn transport_state(&self) -> Option<TransportState> {
        self.transport.as_ref().map(RealtimeTransport::state)
    }
}
