//! Response DTOs for the service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::payment::CardRejection;
use crate::premium::{Feature, Plan, CURRENCY};

/// Response body for GET /cache/get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache/set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/del/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// Whether the key was present
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

/// Response body for POST /cache/mset
#[derive(Debug, Clone, Serialize)]
pub struct SetMultipleResponse {
    pub stored: usize,
}

/// Response body for POST /cache/mget, positionally aligned with the request
#[derive(Debug, Clone, Serialize)]
pub struct GetMultipleResponse {
    pub values: Vec<Option<Value>>,
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Keys plus JSON-encoded values, in bytes
    pub approximate_size_bytes: usize,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, approximate_size_bytes: usize) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            approximate_size_bytes,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One row of GET /premium/plans
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    /// Minor currency units
    pub amount: u64,
    pub currency: &'static str,
    pub features: Vec<Feature>,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        Self {
            plan,
            amount: plan.price_cents(),
            currency: CURRENCY,
            features: plan.features(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanInfo>,
}

impl PlansResponse {
    pub fn all() -> Self {
        Self {
            plans: Plan::ALL.into_iter().map(PlanInfo::from).collect(),
        }
    }
}

/// Response body for POST /premium/validate-card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CardRejection>,
    /// Token to pass to /premium/subscribe when the card is valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

impl CardValidationResponse {
    pub fn accepted(payment_method_id: String) -> Self {
        Self {
            valid: true,
            error: None,
            reason: None,
            payment_method_id: Some(payment_method_id),
        }
    }

    pub fn rejected(reason: CardRejection) -> Self {
        Self {
            valid: false,
            error: Some(reason.to_string()),
            reason: Some(reason),
            payment_method_id: None,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_from_stats() {
        let mut stats = CacheStats::new();
        for _ in 0..4 {
            stats.record_hit();
        }
        stats.record_miss();
        stats.set_total_entries(7);

        let resp = StatsResponse::new(stats, 2048);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 7);
        assert_eq!(resp.approximate_size_bytes, 2048);
    }

    #[test]
    fn test_plans_response_lists_every_plan() {
        let json = serde_json::to_value(PlansResponse::all()).unwrap();
        let plans = json["plans"].as_array().unwrap();

        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0]["plan"], "monthly");
        assert_eq!(plans[0]["amount"], 999);
        assert_eq!(plans[2]["amount"], 29999);
        assert_eq!(plans[1]["currency"], "USD");
    }

    #[test]
    fn test_card_validation_response_shapes() {
        let ok = serde_json::to_value(CardValidationResponse::accepted("pm_1_1486".to_string()))
            .unwrap();
        assert_eq!(ok["valid"], true);
        assert_eq!(ok["paymentMethodId"], "pm_1_1486");
        assert!(ok.get("error").is_none());

        let bad = serde_json::to_value(CardValidationResponse::rejected(CardRejection::Expired))
            .unwrap();
        assert_eq!(bad["valid"], false);
        assert_eq!(bad["error"], "Card expired");
        assert_eq!(bad["reason"], "expired");
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Something went wrong")).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
