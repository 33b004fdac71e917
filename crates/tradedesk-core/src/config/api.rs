//! Backend endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Backend REST/WebSocket endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Explicit WebSocket URL override. When absent, the URL is derived
    /// from `base_url` (`http` → `ws`, `https` → `wss`, path `/ws`).
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Per-request timeout in seconds for one-shot HTTP calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Base URL with any trailing slash removed.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// The WebSocket URL the realtime transport should connect to.
    pub fn websocket_url(&self) -> Result<String, AppError> {
        if let Some(url) = &self.ws_url {
            return Ok(url.clone());
        }

        let base = self.base_url_trimmed();
        if let Some(rest) = base.strip_prefix("https://") {
            Ok(format!("wss://{rest}/ws"))
        } else if let Some(rest) = base.strip_prefix("http://") {
            Ok(format!("ws://{rest}/ws"))
        } else {
            Err(AppError::configuration(format!(
                "Cannot derive WebSocket URL from base URL '{base}'"
            )))
        }
    }

    /// Whether the backend is reached over a secure transport.
    ///
    /// Plain HTTP is accepted for localhost only, mirroring the secure
    /// context rules the push surface requires.
    pub fn is_secure(&self) -> bool {
        let base = self.base_url_trimmed();
        base.starts_with("https://")
            || base.starts_with("http://localhost")
            || base.starts_with("http://127.0.0.1")
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    15
}
