//! Request DTOs for the service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;
use crate::payment::MAX_IP_LENGTH;
use crate::premium::{PaymentData, Plan};

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for PUT /cache/set
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheItem {
    pub key: String,
    pub value: Value,
}

/// Request body for POST /cache/mset
#[derive(Debug, Clone, Deserialize)]
pub struct SetMultipleRequest {
    pub items: Vec<CacheItem>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetMultipleRequest {
    pub fn validate(&self) -> Option<String> {
        self.items.iter().find_map(|item| validate_key(&item.key))
    }
}

/// Request body for POST /cache/mget
#[derive(Debug, Clone, Deserialize)]
pub struct GetMultipleRequest {
    pub keys: Vec<String>,
}

/// Request body for POST /premium/validate-card
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCardRequest {
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
}

/// Request body for POST /premium/check-vpn
#[derive(Debug, Clone, Deserialize)]
pub struct CheckVpnRequest {
    pub ip: String,
}

impl CheckVpnRequest {
    pub fn validate(&self) -> Option<String> {
        let ip = self.ip.trim();
        if ip.is_empty() {
            return Some("ip cannot be empty".to_string());
        }
        if ip.len() > MAX_IP_LENGTH {
            return Some(format!(
                "ip exceeds maximum length of {} characters",
                MAX_IP_LENGTH
            ));
        }
        None
    }
}

/// Request body for POST /premium/subscribe
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: String,
    pub plan: Plan,
    pub payment_method_id: String,
}

impl SubscribeRequest {
    pub fn validate(&self) -> Option<String> {
        if self.user_id.trim().is_empty() {
            return Some("userId cannot be empty".to_string());
        }
        if self.payment_method_id.trim().is_empty() {
            return Some("paymentMethodId cannot be empty".to_string());
        }
        None
    }

    pub fn payment_data(&self) -> PaymentData {
        PaymentData {
            payment_method_id: self.payment_method_id.clone(),
        }
    }
}
