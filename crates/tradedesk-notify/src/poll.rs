//! Polling fallback — request/response delivery when the realtime
//! transport is disabled by configuration.
//!
//! Each tick fetches recent notifications and feeds unseen ones through
//! the same normalize/dispatch path the transport uses, so downstream
//! consumers are transport-agnostic. A failed tick never stops the
//! interval; only `disconnect()` does.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tradedesk_core::config::notifications::NotificationsConfig;

use crate::api::ApiClient;
use crate::dispatch::NotificationHub;
use crate::normalize;

/// Bounded set of already-published notification ids.
///
/// Delivery bookkeeping only: the server's recent window re-serves the
/// same stored rows every tick, and re-publishing them would spam
/// listeners. Capped so long sessions cannot grow it unboundedly.
#[derive(Debug)]
struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
    cap: usize,
}

impl SeenIds {
    fn new(cap: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Returns true when the id was not seen before.
    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

/// Polling fallback delivery path.
#[derive(Debug)]
pub struct PollingFallback {
    /// REST client (credential source and recent endpoint).
    api: Arc<ApiClient>,
    /// Dispatch hub fed exactly like the transport feeds it.
    hub: Arc<NotificationHub>,
    /// Tick interval.
    interval: Duration,
    /// Per-tick fetch limit.
    fetch_limit: usize,
    /// Already-published ids.
    seen: Mutex<SeenIds>,
    /// Cancels the interval task.
    cancel: CancellationToken,
}

impl PollingFallback {
    /// Seen-id history is kept at a multiple of the fetch window so ids
    /// scrolling out of the recent window and back cannot re-publish.
    const SEEN_FACTOR: usize = 4;

    /// Create the poller. Nothing runs until [`start`](Self::start).
    pub fn new(
        api: Arc<ApiClient>,
        hub: Arc<NotificationHub>,
        config: &NotificationsConfig,
    ) -> Self {
        Self {
            api,
            hub,
            interval: Duration::from_secs(config.poll_interval_seconds),
            fetch_limit: config.poll_history_limit,
            seen: Mutex::new(SeenIds::new(config.poll_history_limit * Self::SEEN_FACTOR)),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the interval task. The first tick fires one full interval
    /// after start; the initial page-load fetch goes through
    /// [`NotificationHub::recent_notifications`] instead. Repeat calls
    /// after `disconnect()` are a no-op (the token stays cancelled).
    pub fn start(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            debug!("Polling fallback already stopped; start ignored");
            return;
        }

        info!(interval_seconds = self.interval.as_secs(), "Polling fallback started");
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + poller.interval,
                poller.interval,
            );
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = poller.cancel.cancelled() => break,
                    _ = ticker.tick() => poller.tick().await,
                }
            }
            debug!("Polling fallback stopped");
        });
    }

    /// One polling pass. Failures are logged and never fatal to the
    /// interval.
    pub async fn tick(&self) {
        let Some(credentials) = self.api.credentials() else {
            trace!("Polling tick skipped: no session credential");
            return;
        };

        let items = match self.api.recent(self.fetch_limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Polling tick failed; will retry next interval");
                return;
            }
        };

        for raw in &items {
            let Some(record) = normalize::normalize_stored(raw, Some(&credentials.user_id)) else {
                continue;
            };
            let fresh = {
                let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
                seen.insert(&record.id)
            };
            if fresh {
                self.hub.publish(&record).await;
            }
        }
    }

    /// Cancel the interval and clear the listener registry. Ticks
    /// already scheduled must not fire after this call.
    pub fn disconnect(&self) {
        self.cancel.cancel();
        self.hub.clear();
        info!("Polling fallback disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_ids_deduplicate() {
        let mut seen = SeenIds::new(8);
        assert!(seen.insert("n1"));
        assert!(!seen.insert("n1"));
        assert!(seen.insert("n2"));
    }

    #[test]
    fn seen_ids_evict_oldest_at_cap() {
        let mut seen = SeenIds::new(2);
        assert!(seen.insert("n1"));
        assert!(seen.insert("n2"));
        assert!(seen.insert("n3"));
        // n1 evicted, so it can be seen again.
        assert!(seen.insert("n1"));
        assert!(!seen.insert("n3"));
    }
}
