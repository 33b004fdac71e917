//! Wire message definitions for the realtime transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frames sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Connection-time authentication, sent immediately after open.
    Authenticate {
        /// Opaque session token.
        token: String,
        /// User-type classification.
        #[serde(rename = "userType")]
        user_type: String,
        /// Backend user identifier.
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Channel subscription, one frame per channel after the
    /// authenticated acknowledgement.
    Subscribe {
        /// Channel name.
        channel: String,
    },
}

/// Envelope of every server→client message.
///
/// Parsed leniently: only `type` is required; the nested `notification`
/// object is optional and every other field lands in `extra` so it can be
/// passed through to the record payload untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEnvelope {
    /// Raw event type string.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Nested notification detail, when the event carries one.
    #[serde(default)]
    pub notification: Option<RawNotification>,
    /// Remaining envelope fields (`order`, `customer`, `product`,
    /// `action`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw notification object as stored/sent by the server.
///
/// Also the item shape of `GET /api/notifications/recent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNotification {
    /// Server-side identifier.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Title; may be absent or empty.
    #[serde(default)]
    pub title: Option<String>,
    /// Body; may be absent or empty.
    #[serde(default)]
    pub message: Option<String>,
    /// Event type string (used by the stored-notification path).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Priority string; may be absent, empty, or unrecognized.
    #[serde(default)]
    pub priority: Option<String>,
    /// Creation time, ISO-8601.
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    /// Auxiliary data object, merged into the record payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Display name of the sender, when the server attaches one.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Users who have acknowledged this notification.
    #[serde(default)]
    pub read_by: Vec<ReadMarker>,
}

/// One read acknowledgement on a stored notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadMarker {
    /// User who read the notification.
    pub user_id: String,
}
