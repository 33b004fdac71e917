//! Event normalization — heterogeneous server messages to canonical
//! notification records.
//!
//! Normalization is a total function over the recognized kind set: a
//! recognized event is never dropped merely because the server omitted
//! detail, and an unrecognized event is dropped (logged) rather than
//! failing. Nothing here touches the wall clock except when the message
//! itself carries no usable time, keeping repeated normalization of the
//! same message deterministic.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::message::{RawNotification, ServerEnvelope};
use crate::record::{NotificationKind, NotificationRecord, Priority};

/// Transport-control event type that is not a notification.
pub const EVENT_AUTHENTICATED: &str = "authenticated";

/// Normalize one transport envelope into a record.
///
/// Returns `None` for the `authenticated` acknowledgement (handled by the
/// transport) and for unrecognized event types.
pub fn normalize(envelope: &ServerEnvelope) -> Option<NotificationRecord> {
    normalize_at(envelope, Utc::now())
}

/// Wall-clock-free core of [`normalize`]; `now` is only used when the
/// message carries no `createdAt` of its own.
pub fn normalize_at(envelope: &ServerEnvelope, now: DateTime<Utc>) -> Option<NotificationRecord> {
    if envelope.event_type == EVENT_AUTHENTICATED {
        return None;
    }

    let kind = match NotificationKind::from_raw(&envelope.event_type) {
        Some(k) => k,
        None => {
            debug!(event_type = %envelope.event_type, "Dropping unrecognized event type");
            return None;
        }
    };

    let mut payload = envelope.extra.clone();
    Some(build_record(
        kind,
        envelope.notification.as_ref(),
        &mut payload,
        now,
        false,
    ))
}

/// Normalize one stored notification (the `recent` endpoint item shape).
///
/// `current_user` resolves the read flag against the stored `read_by`
/// markers.
pub fn normalize_stored(
    raw: &RawNotification,
    current_user: Option<&str>,
) -> Option<NotificationRecord> {
    normalize_stored_at(raw, current_user, Utc::now())
}

/// Wall-clock-free core of [`normalize_stored`].
pub fn normalize_stored_at(
    raw: &RawNotification,
    current_user: Option<&str>,
    now: DateTime<Utc>,
) -> Option<NotificationRecord> {
    let raw_kind = raw.kind.as_deref().unwrap_or_default();
    let kind = match NotificationKind::from_raw(raw_kind) {
        Some(k) => k,
        None => {
            debug!(event_type = %raw_kind, "Dropping stored notification of unrecognized type");
            return None;
        }
    };

    let read = match current_user {
        Some(uid) => raw.read_by.iter().any(|m| m.user_id == uid),
        None => false,
    };

    let mut payload = Map::new();
    Some(build_record(kind, Some(raw), &mut payload, now, read))
}

/// Assemble the record, substituting the kind's defaults for every
/// missing or empty field.
fn build_record(
    kind: NotificationKind,
    raw: Option<&RawNotification>,
    payload: &mut Map<String, Value>,
    now: DateTime<Utc>,
    read: bool,
) -> NotificationRecord {
    let title = raw
        .and_then(|n| n.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| kind.default_title().to_string());

    let message = raw
        .and_then(|n| n.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| kind.default_message().to_string());

    let priority = raw
        .and_then(|n| n.priority.as_deref())
        .and_then(Priority::parse)
        .unwrap_or_else(|| kind.default_priority());

    let timestamp = raw
        .and_then(|n| n.created_at.as_deref())
        .and_then(parse_timestamp)
        .unwrap_or(now);

    if let Some(n) = raw {
        if let Some(Value::Object(data)) = &n.data {
            for (k, v) in data {
                payload.insert(k.clone(), v.clone());
            }
        }
        if let Some(sender) = &n.sender_name {
            payload.insert("sender_name".to_string(), Value::String(sender.clone()));
        }
    }

    let id = raw
        .and_then(|n| n.id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| {
            synthetic_id(kind, raw.and_then(|n| n.created_at.as_deref()), payload)
        });

    NotificationRecord {
        id,
        kind,
        title,
        message,
        priority,
        timestamp,
        payload: std::mem::take(payload),
        read,
    }
}

/// Id for events the server sent without one. Derived from the message
/// contents alone (never the wall clock), so repeated normalization of
/// the same message yields the same record.
fn synthetic_id(
    kind: NotificationKind,
    created_at: Option<&str>,
    payload: &Map<String, Value>,
) -> String {
    let mut hasher = DefaultHasher::new();
    created_at.unwrap_or_default().hash(&mut hasher);
    if let Ok(fields) = serde_json::to_string(payload) {
        fields.hash(&mut hasher);
    }
    format!("{}-{:016x}", kind.as_str(), hasher.finish())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn bare_envelope(event_type: &str) -> ServerEnvelope {
        serde_json::from_value(serde_json::json!({ "type": event_type })).expect("envelope")
    }

    #[test]
    fn defaults_are_total_for_every_recognized_kind() {
        for kind in NotificationKind::ALL {
            let record = normalize_at(&bare_envelope(kind.as_str()), fixed_now())
                .unwrap_or_else(|| panic!("{} should normalize", kind.as_str()));
            assert!(!record.title.is_empty());
            assert!(!record.message.is_empty());
            assert_eq!(record.priority, kind.default_priority());
            assert_eq!(record.timestamp, fixed_now());
            assert!(!record.read);
        }
    }

    #[test]
    fn unknown_type_returns_none_without_panicking() {
        assert!(normalize(&bare_envelope("not_a_real_type")).is_none());
    }

    #[test]
    fn authenticated_ack_is_not_a_notification() {
        assert!(normalize(&bare_envelope(EVENT_AUTHENTICATED)).is_none());
    }

    #[test]
    fn new_order_end_to_end_mapping() {
        let envelope: ServerEnvelope = serde_json::from_value(serde_json::json!({
            "type": "new_order",
            "notification": {
                "_id": "n1",
                "title": "",
                "message": "",
                "type": "new_order",
                "priority": "",
                "createdAt": "2024-01-01T00:00:00Z"
            }
        }))
        .expect("envelope");

        let record = normalize_at(&envelope, fixed_now()).expect("record");
        assert_eq!(record.id, "n1");
        assert_eq!(record.kind, NotificationKind::NewOrder);
        assert_eq!(record.title, "New Order Received");
        assert_eq!(record.message, "A new order has been placed");
        assert_eq!(record.priority, Priority::High);
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn repeated_normalization_is_deterministic() {
        let envelope: ServerEnvelope = serde_json::from_value(serde_json::json!({
            "type": "invoice",
            "notification": {
                "_id": "n7",
                "title": "Invoice #42",
                "message": "Invoice issued for order o-42",
                "priority": "medium",
                "createdAt": "2024-03-10T08:30:00Z"
            },
            "order": { "id": "o-42" }
        }))
        .expect("envelope");

        let first = normalize_at(&envelope, fixed_now()).expect("first");
        let second = normalize_at(&envelope, fixed_now()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn payload_passes_envelope_fields_and_data_through() {
        let envelope: ServerEnvelope = serde_json::from_value(serde_json::json!({
            "type": "order_update",
            "notification": {
                "_id": "n2",
                "data": { "orderId": "o-9" },
                "sender_name": "Dana"
            },
            "order": { "id": "o-9", "status": "shipped" },
            "action": "status_change"
        }))
        .expect("envelope");

        let record = normalize_at(&envelope, fixed_now()).expect("record");
        assert_eq!(record.payload["order"]["status"], "shipped");
        assert_eq!(record.payload["action"], "status_change");
        assert_eq!(record.payload["orderId"], "o-9");
        assert_eq!(record.payload["sender_name"], "Dana");
    }

    #[test]
    fn missing_server_id_gets_a_stable_synthetic_id() {
        let envelope = bare_envelope("new_order");
        let first = normalize_at(&envelope, fixed_now()).expect("first");
        let second = normalize_at(&envelope, fixed_now()).expect("second");
        assert!(!first.id.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn synthetic_ids_distinguish_distinct_events() {
        let a: ServerEnvelope =
            serde_json::from_value(serde_json::json!({ "type": "new_order", "order": { "id": "o-1" } }))
                .expect("envelope");
        let b: ServerEnvelope =
            serde_json::from_value(serde_json::json!({ "type": "new_order", "order": { "id": "o-2" } }))
                .expect("envelope");

        let first = normalize_at(&a, fixed_now()).expect("first");
        let second = normalize_at(&b, fixed_now()).expect("second");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn stored_notification_resolves_read_state() {
        let raw: RawNotification = serde_json::from_value(serde_json::json!({
            "_id": "n5",
            "type": "payment",
            "title": "Payment received",
            "message": "Payment for invoice #12",
            "read_by": [{ "user_id": "u-1" }]
        }))
        .expect("raw");

        let mine = normalize_stored_at(&raw, Some("u-1"), fixed_now()).expect("record");
        assert!(mine.read);
        let theirs = normalize_stored_at(&raw, Some("u-2"), fixed_now()).expect("record");
        assert!(!theirs.read);
    }

    #[test]
    fn invalid_timestamp_falls_back_to_now() {
        let envelope: ServerEnvelope = serde_json::from_value(serde_json::json!({
            "type": "delivery",
            "notification": { "_id": "n6", "createdAt": "yesterday-ish" }
        }))
        .expect("envelope");

        let record = normalize_at(&envelope, fixed_now()).expect("record");
        assert_eq!(record.timestamp, fixed_now());
    }
}
