//! Background delivery channel.
//!
//! Owns the long-lived display worker and keeps the server's record of
//! the push subscription in sync. Every operation degrades instead of
//! failing: a missing public key disables the feature, a failed forward
//! is logged, a failed display is swallowed.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::capability::CapabilityProbe;
use crate::capability::PermissionState;

use super::subscription::PushSubscription;

/// One queued display request.
#[derive(Debug)]
struct DisplayRequest {
    title: String,
    body: String,
}

/// Handle to the registered display worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    /// Stable identity of the underlying registration.
    pub id: Uuid,
    /// Queue into the worker task.
    sender: mpsc::Sender<DisplayRequest>,
}

/// Background delivery channel: display worker plus push subscription
/// lifecycle.
#[derive(Debug)]
pub struct BackgroundDelivery {
    /// Capability probe (also provides platform access).
    probe: Arc<CapabilityProbe>,
    /// REST client for subscription forwarding.
    api: Arc<ApiClient>,
    /// Server-provided push gateway public key.
    public_key: Option<String>,
    /// Registered worker, if any.
    worker: Mutex<Option<WorkerHandle>>,
    /// Live subscription, if any.
    subscription: Mutex<Option<PushSubscription>>,
}

impl BackgroundDelivery {
    /// Queue depth for the display worker.
    const WORKER_QUEUE: usize = 32;

    /// Create the channel. `public_key` comes from configuration; absence
    /// silently disables subscription.
    pub fn new(
        probe: Arc<CapabilityProbe>,
        api: Arc<ApiClient>,
        public_key: Option<String>,
    ) -> Self {
        Self {
            probe,
            api,
            public_key: public_key.filter(|k| !k.is_empty()),
            worker: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    /// Register the display worker. Idempotent: repeat calls return the
    /// existing registration. Returns `None` (logged) when the platform
    /// cannot display.
    pub fn register_worker(&self) -> Option<WorkerHandle> {
        let mut guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = guard.as_ref() {
            debug!(worker_id = %existing.id, "Display worker already registered");
            return Some(existing.clone());
        }

        if !self.probe.platform().supports_display() {
            warn!("Display worker registration failed: no display capability");
            return None;
        }

        let (tx, mut rx) = mpsc::channel::<DisplayRequest>(Self::WORKER_QUEUE);
        let platform = Arc::clone(self.probe.platform());
        let handle = WorkerHandle {
            id: Uuid::new_v4(),
            sender: tx,
        };

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                if let Err(e) = platform.show(&request.title, &request.body).await {
                    warn!(error = %e, "Display worker failed to show notification");
                }
            }
            debug!("Display worker stopped");
        });

        info!(worker_id = %handle.id, "Display worker registered");
        *guard = Some(handle.clone());
        Some(handle)
    }

    /// Create (or return the existing) push subscription and forward it
    /// to the server. A forwarding failure is logged but does not unwind
    /// the subscription; the platform registration is authoritative.
    pub async fn subscribe(&self) -> Option<PushSubscription> {
        {
            let guard = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = guard.as_ref() {
                return Some(existing.clone());
            }
        }

        let key = match &self.public_key {
            Some(k) => k.as_str(),
            None => {
                warn!("Push gateway public key not configured; background delivery disabled");
                return None;
            }
        };

        let subscription = PushSubscription::generate(key);
        {
            let mut guard = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            *guard = Some(subscription.clone());
        }

        if let Err(e) = self.api.subscribe_push(&subscription).await {
            warn!(error = %e, "Failed to forward push subscription to server");
        } else {
            info!(endpoint = %subscription.endpoint, "Push subscription registered");
        }

        Some(subscription)
    }

    /// Tear down the platform subscription, then best-effort notify the
    /// server. Returns the platform-level result regardless of whether
    /// the server call succeeded.
    pub async fn unsubscribe(&self) -> bool {
        let existed = {
            let mut guard = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            guard.take().is_some()
        };

        if let Err(e) = self.api.unsubscribe_push().await {
            debug!(error = %e, "Failed to notify server of push unsubscribe");
        }

        existed
    }

    /// Orchestrates probe → worker → permission → subscribe, short-
    /// circuiting to false at the first unmet precondition. The only
    /// entry point other components should call; safe to call repeatedly.
    pub async fn initialize(&self) -> bool {
        if !self.probe.is_supported() {
            debug!("Background delivery unavailable in this environment");
            return false;
        }

        if self.register_worker().is_none() {
            return false;
        }

        match self.probe.permission_state() {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                debug!("Background delivery disabled: permission denied");
                return false;
            }
            PermissionState::Default => {
                if !self.probe.request_permission().await {
                    debug!("Background delivery disabled: permission not granted");
                    return false;
                }
            }
        }

        self.subscribe().await.is_some()
    }

    /// Display a notification via the worker if registered, else via the
    /// platform directly. Display failures are swallowed and logged;
    /// callers have already delivered the record to in-app listeners.
    pub async fn show_notification(&self, title: &str, body: &str) {
        let worker = {
            let guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };

        match worker {
            Some(handle) => {
                let request = DisplayRequest {
                    title: title.to_string(),
                    body: body.to_string(),
                };
                if let Err(e) = handle.sender.try_send(request) {
                    debug!(error = %e, "Display queue rejected notification");
                }
            }
            None => {
                if let Err(e) = self.probe.platform().show(title, body).await {
                    warn!(error = %e, "Direct notification display failed");
                }
            }
        }
    }

    /// Whether visual display is currently permitted.
    pub fn permission_granted(&self) -> bool {
        self.probe.permission_state().is_granted()
    }
}
