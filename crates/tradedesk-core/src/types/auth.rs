//! Session credentials.

use serde::{Deserialize, Serialize};

use super::user::UserType;

/// The credential triple carried by an authenticated session.
///
/// The token is opaque to the client; it is forwarded verbatim in the
/// transport authenticate frame and as the HTTP bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Opaque bearer token.
    pub token: String,
    /// User-type classification, fixed for the session.
    pub user_type: UserType,
    /// Backend user identifier.
    pub user_id: String,
}
