//! Canonical notification record and its closed kind enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Notification priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority — background events
    Low,
    /// Medium priority — standard events
    Medium,
    /// High priority — important events
    High,
    /// Urgent priority — requires immediate attention
    Urgent,
}

impl Priority {
    /// Parse from a raw wire string. Empty or unrecognized values yield
    /// `None` so the caller can substitute the kind-specific default.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    /// Convert to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// The closed set of event kinds the client understands.
///
/// Raw event types outside this set are dropped during normalization,
/// keeping the client forward-compatible with server additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    OrderUpdate,
    NewOrder,
    OrderApproved,
    OrderRejected,
    ItemApprovalStatus,
    Delivery,
    Invoice,
    Payment,
    CustomerAssignment,
    CategoryAssignment,
    CustomerCreated,
    UserCreated,
    ProductUpdate,
    SystemAlert,
}

impl NotificationKind {
    /// Every recognized kind, in wire order. Used by the normalizer tests
    /// to prove the defaults table is total.
    pub const ALL: [NotificationKind; 18] = [
        Self::Info,
        Self::Success,
        Self::Warning,
        Self::Error,
        Self::OrderUpdate,
        Self::NewOrder,
        Self::OrderApproved,
        Self::OrderRejected,
        Self::ItemApprovalStatus,
        Self::Delivery,
        Self::Invoice,
        Self::Payment,
        Self::CustomerAssignment,
        Self::CategoryAssignment,
        Self::CustomerCreated,
        Self::UserCreated,
        Self::ProductUpdate,
        Self::SystemAlert,
    ];

    /// Map a raw wire type onto a kind. Returns `None` for anything the
    /// client has not learned.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "order_update" => Some(Self::OrderUpdate),
            "new_order" => Some(Self::NewOrder),
            "order_approved" => Some(Self::OrderApproved),
            "order_rejected" => Some(Self::OrderRejected),
            "item_approval_status" => Some(Self::ItemApprovalStatus),
            "delivery" => Some(Self::Delivery),
            "invoice" => Some(Self::Invoice),
            "payment" => Some(Self::Payment),
            "customer_assignment" => Some(Self::CustomerAssignment),
            "category_assignment" => Some(Self::CategoryAssignment),
            "customer_created" => Some(Self::CustomerCreated),
            "user_created" => Some(Self::UserCreated),
            "product_update" => Some(Self::ProductUpdate),
            "system_alert" => Some(Self::SystemAlert),
            _ => None,
        }
    }

    /// The wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::OrderUpdate => "order_update",
            Self::NewOrder => "new_order",
            Self::OrderApproved => "order_approved",
            Self::OrderRejected => "order_rejected",
            Self::ItemApprovalStatus => "item_approval_status",
            Self::Delivery => "delivery",
            Self::Invoice => "invoice",
            Self::Payment => "payment",
            Self::CustomerAssignment => "customer_assignment",
            Self::CategoryAssignment => "category_assignment",
            Self::CustomerCreated => "customer_created",
            Self::UserCreated => "user_created",
            Self::ProductUpdate => "product_update",
            Self::SystemAlert => "system_alert",
        }
    }

    /// Default title substituted when the server omits one.
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Info => "Information",
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::OrderUpdate => "Order Updated",
            Self::NewOrder => "New Order Received",
            Self::OrderApproved => "Order Approved",
            Self::OrderRejected => "Order Rejected",
            Self::ItemApprovalStatus => "Item Approval Update",
            Self::Delivery => "Delivery Update",
            Self::Invoice => "New Invoice",
            Self::Payment => "Payment Received",
            Self::CustomerAssignment => "Customer Assigned",
            Self::CategoryAssignment => "Category Assigned",
            Self::CustomerCreated => "New Customer",
            Self::UserCreated => "New User",
            Self::ProductUpdate => "Product Updated",
            Self::SystemAlert => "System Alert",
        }
    }

    /// Default body substituted when the server omits one.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Info => "You have a new notification",
            Self::Success => "The operation completed successfully",
            Self::Warning => "Something needs your attention",
            Self::Error => "Something went wrong",
            Self::OrderUpdate => "An order has been updated",
            Self::NewOrder => "A new order has been placed",
            Self::OrderApproved => "An order has been approved",
            Self::OrderRejected => "An order has been rejected",
            Self::ItemApprovalStatus => "An order item's approval status changed",
            Self::Delivery => "A delivery status has changed",
            Self::Invoice => "An invoice has been issued",
            Self::Payment => "A payment has been recorded",
            Self::CustomerAssignment => "A customer has been assigned to you",
            Self::CategoryAssignment => "A product category has been assigned",
            Self::CustomerCreated => "A new customer account has been created",
            Self::UserCreated => "A new user account has been created",
            Self::ProductUpdate => "A product has been updated",
            Self::SystemAlert => "A system alert has been raised",
        }
    }

    /// Default priority for the kind.
    pub fn default_priority(&self) -> Priority {
        match self {
            Self::Error | Self::SystemAlert => Priority::Urgent,
            Self::NewOrder | Self::OrderApproved | Self::OrderRejected | Self::Payment => {
                Priority::High
            }
            Self::Info | Self::Success | Self::ProductUpdate | Self::CategoryAssignment => {
                Priority::Low
            }
            _ => Priority::Medium,
        }
    }
}

/// The canonical unit flowing through the delivery system.
///
/// Created the instant a raw event is normalized and never mutated
/// afterwards except for `read` flipping false→true on acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Opaque stable identifier, unique per server-side notification.
    pub id: String,
    /// Which recognized event kind produced this record.
    pub kind: NotificationKind,
    /// Short human title; never empty.
    pub title: String,
    /// Human message body; never empty.
    pub message: String,
    /// Delivery priority.
    pub priority: Priority,
    /// Recency sort key. Consumers must order by this, not arrival order.
    pub timestamp: DateTime<Utc>,
    /// Auxiliary fields (order id, customer id, ...) passed through
    /// unchanged for deep-linking. Opaque to the normalizer.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Read state for the delivery target.
    #[serde(default)]
    pub read: bool,
}

impl NotificationRecord {
    /// Flip the read flag. The only permitted mutation after creation.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_roundtrip() {
        for kind in NotificationKind::ALL {
            assert_eq!(NotificationKind::from_raw(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn priority_parse_rejects_unknown() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse("URGENT"), Some(Priority::Urgent));
        assert_eq!(Priority::parse(""), None);
        assert_eq!(Priority::parse("critical"), None);
    }

    #[test]
    fn documented_priority_defaults() {
        assert_eq!(NotificationKind::NewOrder.default_priority(), Priority::High);
        assert_eq!(
            NotificationKind::OrderApproved.default_priority(),
            Priority::High
        );
        assert_eq!(
            NotificationKind::ProductUpdate.default_priority(),
            Priority::Low
        );
        assert_eq!(
            NotificationKind::SystemAlert.default_priority(),
            Priority::Urgent
        );
    }

    #[test]
    fn defaults_table_is_total() {
        for kind in NotificationKind::ALL {
            assert!(!kind.default_title().is_empty(), "{kind:?} title");
            assert!(!kind.default_message().is_empty(), "{kind:?} message");
        }
    }
}
