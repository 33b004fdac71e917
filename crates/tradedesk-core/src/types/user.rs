//! User-type classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a backend session.
///
/// The set of realtime channels a session subscribes to is a pure function
/// of this classification, fixed at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Full back-office administrator.
    Admin,
    /// Sales/inventory manager.
    Manager,
    /// External B2B customer account.
    Customer,
}

impl UserType {
    /// The fixed channel set this user type subscribes to after
    /// authentication.
    pub fn channels(&self) -> &'static [&'static str] {
        match self {
            Self::Admin => &["orders", "customers", "products", "system", "notifications"],
            Self::Manager => &["orders", "customers", "products", "notifications"],
            Self::Customer => &["orders", "notifications"],
        }
    }

    /// Return the classification as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "customer" => Ok(Self::Customer),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}
