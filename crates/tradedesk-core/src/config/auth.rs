//! Session credential configuration.
//!
//! The agent does not mint or verify tokens; the session credential is an
//! opaque bearer token issued by the backend and supplied via config or
//! environment (`TRADEDESK__AUTH__TOKEN`).

use serde::{Deserialize, Serialize};

use crate::types::auth::Credentials;
use crate::types::user::UserType;

/// Session credential settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Opaque bearer token for the backend session.
    #[serde(default)]
    pub token: Option<String>,
    /// User-type classification of the session.
    #[serde(default)]
    pub user_type: Option<UserType>,
    /// Backend user identifier.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AuthConfig {
    /// Assemble credentials when all three fields are present.
    pub fn credentials(&self) -> Option<Credentials> {
        let token = self.token.clone()?;
        if token.is_empty() {
            return None;
        }
        Some(Credentials {
            token,
            user_type: self.user_type.unwrap_or(UserType::Customer),
            user_id: self.user_id.clone().unwrap_or_default(),
        })
    }
}
