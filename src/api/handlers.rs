//! API Handlers
//!
//! HTTP request handlers for the cache and premium endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::ExpiringCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    CardValidationResponse, CheckVpnRequest, DeleteResponse, GetMultipleRequest,
    GetMultipleResponse, GetResponse, HealthResponse, KeysResponse, PlansResponse,
    SetMultipleRequest, SetMultipleResponse, SetRequest, SetResponse, StatsResponse,
    SubscribeRequest, ValidateCardRequest,
};
use crate::payment::{
    payment_method_id_for_card, validate_card, CachedIpRiskCheck, HeuristicVpnCheck,
    IpRiskCheck, MockPaymentGateway, VpnCheck,
};
use crate::premium::{
    CancelOutcome, InMemoryRepository, InMemoryUserDirectory, JsonFileRepository,
    PremiumSettings, StatusReport, SubscribeOutcome, SubscriptionManager,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache of arbitrary JSON values
    pub cache: Arc<RwLock<ExpiringCache<Value>>>,
    pub premium: Arc<SubscriptionManager>,
    pub risk: Arc<dyn IpRiskCheck>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        cache: ExpiringCache<Value>,
        premium: SubscriptionManager,
        risk: Arc<dyn IpRiskCheck>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            premium: Arc::new(premium),
            risk,
            clock,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Subscription records are loaded from `premium_store_path`; a corrupt
    /// store fails startup rather than being overwritten.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let cache = ExpiringCache::with_clock(config.default_ttl(), clock.clone());
        let gateway = MockPaymentGateway::with_clock(
            Duration::from_millis(config.payment_latency_ms),
            config.payment_decline_rate,
            clock.clone(),
        );
        let premium = SubscriptionManager::load(
            Arc::new(JsonFileRepository::new(config.premium_store_path.clone())),
            Arc::new(InMemoryUserDirectory::with_demo_user()),
            Arc::new(gateway),
            clock.clone(),
            config.premium_settings(),
        )
        .await?;
        let risk = CachedIpRiskCheck::new(
            HeuristicVpnCheck::new(
                Duration::from_millis(config.vpn_check_latency_ms),
                config.vpn_random_rate,
            ),
            Duration::from_secs(config.vpn_cache_ttl),
            clock.clone(),
        );

        Ok(Self::new(cache, premium, Arc::new(risk), clock))
    }

    /// Deterministic state with no persistence, latency or random outcomes.
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let cache = ExpiringCache::with_clock(Duration::from_secs(300), clock.clone());
        let premium = SubscriptionManager::load(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryUserDirectory::with_demo_user()),
            Arc::new(MockPaymentGateway::instant(clock.clone())),
            clock.clone(),
            PremiumSettings::default(),
        )
        .await?;
        let risk = HeuristicVpnCheck::new(Duration::ZERO, 0.0);

        Ok(Self::new(cache, premium, Arc::new(risk), clock))
    }
}

// == Cache Handlers ==

/// Handler for PUT /cache/set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.set(req.key.clone(), req.value, req.ttl.map(Duration::from_secs));

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads may evict and always update stats
    let mut cache = state.cache.write().await;
    let value = cache
        .get(&key)
        .ok_or_else(|| AppError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.write().await.delete(&key);
    Json(DeleteResponse { key, deleted })
}

/// Handler for GET /cache/keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let mut keys = state.cache.read().await.keys();
    keys.sort();
    Json(KeysResponse { keys })
}

/// Handler for POST /cache/mset
pub async fn set_multiple_handler(
    State(state): State<AppState>,
    Json(req): Json<SetMultipleRequest>,
) -> Result<Json<SetMultipleResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let stored = req.items.len();
    let items = req.items.into_iter().map(|item| (item.key, item.value));
    state
        .cache
        .write()
        .await
        .set_multiple(items, req.ttl.map(Duration::from_secs));

    Ok(Json(SetMultipleResponse { stored }))
}

/// Handler for POST /cache/mget
pub async fn get_multiple_handler(
    State(state): State<AppState>,
    Json(req): Json<GetMultipleRequest>,
) -> Json<GetMultipleResponse> {
    let values = state.cache.write().await.get_multiple(&req.keys);
    Json(GetMultipleResponse { values })
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::new(cache.stats(), cache.approximate_size_bytes()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Premium Handlers ==

/// Handler for GET /premium/plans
pub async fn plans_handler() -> Json<PlansResponse> {
    Json(PlansResponse::all())
}

/// Handler for POST /premium/validate-card
///
/// A rejected card is a normal answer (`valid: false`), not an HTTP error.
pub async fn validate_card_handler(
    State(state): State<AppState>,
    Json(req): Json<ValidateCardRequest>,
) -> Json<CardValidationResponse> {
    let now = state.clock.now();

    match validate_card(&req.card_number, &req.expiry, &req.cvc, now.date_naive()) {
        Ok(()) => {
            let payment_method_id = payment_method_id_for_card(&req.card_number, now);
            debug!(%payment_method_id, "Card accepted");
            Json(CardValidationResponse::accepted(payment_method_id))
        }
        Err(reason) => {
            debug!(?reason, "Card rejected");
            Json(CardValidationResponse::rejected(reason))
        }
    }
}

/// Handler for POST /premium/check-vpn
pub async fn check_vpn_handler(
    State(state): State<AppState>,
    Json(req): Json<CheckVpnRequest>,
) -> Result<Json<VpnCheck>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    Ok(Json(state.risk.check_vpn(req.ip.trim()).await))
}

/// Handler for POST /premium/subscribe
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeOutcome>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    info!(user_id = %req.user_id, plan = %req.plan, "Subscription requested");
    let outcome = state
        .premium
        .subscribe(&req.user_id, req.plan, &req.payment_data())
        .await?;

    Ok(Json(outcome))
}

/// Handler for GET /premium/status/:user_id
pub async fn status_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusReport>> {
    Ok(Json(state.premium.check_status(&user_id).await?))
}

/// Handler for POST /premium/cancel/:user_id
pub async fn cancel_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CancelOutcome>> {
    Ok(Json(state.premium.cancel(&user_id).await?))
}
