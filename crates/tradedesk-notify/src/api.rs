//! REST client for the notification endpoints.
//!
//! Holds the session credential for the whole subsystem; the transport
//! and polling paths read it from here so sign-in/sign-out is a single
//! `set_credentials` call.

use std::sync::Mutex;
use std::time::Duration;

use tradedesk_core::config::api::ApiConfig;
use tradedesk_core::types::auth::Credentials;
use tradedesk_core::{AppError, AppResult};

use crate::message::RawNotification;
use crate::push::subscription::PushSubscription;

/// Thin client over the backend notification endpoints.
#[derive(Debug)]
pub struct ApiClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Base URL without trailing slash.
    base_url: String,
    /// Current session credential, if signed in.
    credentials: Mutex<Option<Credentials>>,
}

impl ApiClient {
    /// Create a new client from configuration.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    tradedesk_core::error::ErrorKind::Internal,
                    "Failed to build HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            http,
            base_url: config.base_url_trimmed().to_string(),
            credentials: Mutex::new(None),
        })
    }

    /// Replace the session credential (`None` on sign-out).
    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        let mut guard = self
            .credentials
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *guard = credentials;
    }

    /// Snapshot of the current credential.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn bearer_token(&self) -> AppResult<String> {
        self.credentials()
            .map(|c| c.token)
            .ok_or_else(|| AppError::authentication("No session credential available"))
    }

    /// `GET /api/notifications/recent?limit=N`.
    pub async fn recent(&self, limit: usize) -> AppResult<Vec<RawNotification>> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/notifications/recent", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("limit", limit)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    tradedesk_core::error::ErrorKind::ExternalService,
                    "Recent notifications request failed",
                    e,
                )
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::external_service(format!("Recent notifications request rejected: {e}"))
            })?;

        response.json::<Vec<RawNotification>>().await.map_err(|e| {
            AppError::with_source(
                tradedesk_core::error::ErrorKind::Serialization,
                "Failed to decode recent notifications",
                e,
            )
        })
    }

    /// `POST /api/notifications/{id}/read`.
    pub async fn mark_read(&self, id: &str) -> AppResult<()> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/notifications/{id}/read", self.base_url);

        self.http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    tradedesk_core::error::ErrorKind::ExternalService,
                    "Mark-read request failed",
                    e,
                )
            })?
            .error_for_status()
            .map_err(|e| AppError::external_service(format!("Mark-read request rejected: {e}")))?;

        Ok(())
    }

    /// `POST /api/notifications/subscribe` with the subscription body.
    pub async fn subscribe_push(&self, subscription: &PushSubscription) -> AppResult<()> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/notifications/subscribe", self.base_url);

        self.http
            .post(&url)
            .bearer_auth(token)
            .json(subscription)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    tradedesk_core::error::ErrorKind::ExternalService,
                    "Push subscribe request failed",
                    e,
                )
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::external_service(format!("Push subscribe request rejected: {e}"))
            })?;

        Ok(())
    }

    /// `POST /api/notifications/unsubscribe`.
    pub async fn unsubscribe_push(&self) -> AppResult<()> {
        let token = self.bearer_token()?;
        let url = format!("{}/api/notifications/unsubscribe", self.base_url);

        self.http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    tradedesk_core::error::ErrorKind::ExternalService,
                    "Push unsubscribe request failed",
                    e,
                )
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::external_service(format!("Push unsubscribe request rejected: {e}"))
            })?;

        Ok(())
    }
}
