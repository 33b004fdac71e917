//! Notification dispatch and listener registry.
//!
//! Fan-out point for every normalized record, whether it arrived over the
//! realtime transport or the polling fallback. Listeners are invoked in
//! registration order against a snapshot, so unsubscribing mid-publish
//! never affects the current pass; a panicking listener is isolated and
//! logged so it cannot block delivery to the others.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, warn};

use crate::api::ApiClient;
use crate::normalize;
use crate::push::BackgroundDelivery;
use crate::record::NotificationRecord;

/// Listener callback type.
pub type ListenerFn = Arc<dyn Fn(&NotificationRecord) + Send + Sync>;

/// Token returned from [`NotificationHub::subscribe`]. Calling
/// [`unsubscribe`](ListenerGuard::unsubscribe) removes exactly the
/// callback it was issued for; calling it twice is safe.
#[derive(Debug)]
pub struct ListenerGuard {
    id: u64,
    hub: Weak<NotificationHub>,
}

impl ListenerGuard {
    /// Remove the associated listener. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

/// Process-wide dispatch hub; one per page session, constructed by the
/// context and injected into components that need it.
pub struct NotificationHub {
    /// Registered listeners in registration order.
    listeners: Mutex<Vec<(u64, ListenerFn)>>,
    /// Next listener id.
    next_id: AtomicU64,
    /// REST client for recent-fetch and read-state.
    api: Arc<ApiClient>,
    /// Background channel for the visual delivery leg.
    push: Arc<BackgroundDelivery>,
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl NotificationHub {
    /// Create the hub.
    pub fn new(api: Arc<ApiClient>, push: Arc<BackgroundDelivery>) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            api,
            push,
        }
    }

    /// Register a callback invoked once per published record, in
    /// registration order.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> ListenerGuard
    where
        F: Fn(&NotificationRecord) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        guard.push((id, Arc::new(callback)));
        ListenerGuard {
            id,
            hub: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        let mut guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|(lid, _)| *lid != id);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Remove every listener (sign-out path).
    pub fn clear(&self) {
        let mut guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }

    /// Deliver one record to every registered listener, then surface it
    /// on the visual channel (gated on permission).
    pub async fn publish(&self, record: &NotificationRecord) {
        let snapshot: Vec<ListenerFn> = {
            let guard = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            guard.iter().map(|(_, f)| Arc::clone(f)).collect()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(record))).is_err() {
                error!(
                    notification_id = %record.id,
                    "Notification listener panicked; continuing delivery"
                );
            }
        }

        if self.push.permission_granted() {
            self.push
                .show_notification(&record.title, &record.message)
                .await;
        }
    }

    /// One-shot fetch-and-normalize of stored notifications. Returns an
    /// empty vec (never an error) on any request failure.
    pub async fn recent_notifications(&self, limit: usize) -> Vec<NotificationRecord> {
        let current_user = self.api.credentials().map(|c| c.user_id);

        match self.api.recent(limit).await {
            Ok(items) => items
                .iter()
                .filter_map(|raw| normalize::normalize_stored(raw, current_user.as_deref()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch recent notifications");
                Vec::new()
            }
        }
    }

    /// Number of unread notifications among the most recent `limit`.
    pub async fn unread_count(&self, limit: usize) -> usize {
        self.recent_notifications(limit)
            .await
            .iter()
            .filter(|r| !r.read)
            .count()
    }

    /// Fire-and-forget server-side read acknowledgement. Records already
    /// published stay immutable; flipping a local copy's flag is the
    /// caller's concern.
    pub fn mark_as_read(&self, id: &str) {
        let api = Arc::clone(&self.api);
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = api.mark_read(&id).await {
                debug!(notification_id = %id, error = %e, "Mark-read request failed");
            }
        });
    }
}
