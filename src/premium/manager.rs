//! Subscription manager
//!
//! Owns the subscription records: subscribe through the payment gateway,
//! enforce expiry when status is read, and cancel with a refund verdict.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::payment::{PaymentGateway, PaymentResult};
use crate::premium::record::is_refund_eligible;
use crate::premium::{
    Feature, Plan, SubscriptionMap, SubscriptionRecord, SubscriptionRepository,
    SubscriptionStatus, UserDirectory,
};

pub const WELCOME_MESSAGE: &str = "Welcome to Minigram Verified!";
pub const CANCELLED_MESSAGE: &str = "Subscription cancelled successfully";

// == Settings ==
#[derive(Debug, Clone)]
pub struct PremiumSettings {
    /// Upper bound on a single gateway call
    pub payment_timeout: Duration,
    /// Days after the start during which a cancellation is refundable
    pub refund_window_days: i64,
}

impl Default for PremiumSettings {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(10),
            refund_window_days: 14,
        }
    }
}

/// Tokenized payment method supplied by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub payment_method_id: String,
}

// == Outcomes ==
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOutcome {
    pub success: bool,
    pub subscription: SubscriptionRecord,
    pub payment: PaymentResult,
    pub message: String,
}

/// Entitlement view of a user's subscription at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_premium: bool,
    pub is_verified: bool,
    pub expired: bool,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment: Option<DateTime<Utc>>,
    pub features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReport {
    fn not_subscribed() -> Self {
        Self {
            is_premium: false,
            is_verified: false,
            expired: false,
            cancelled: false,
            plan: None,
            subscription_end: None,
            days_remaining: None,
            next_payment: None,
            features: Vec::new(),
            message: Some("Not subscribed".to_string()),
        }
    }

    fn for_record(record: &SubscriptionRecord, now: DateTime<Utc>) -> Self {
        let revoked = Self {
            plan: Some(record.plan),
            subscription_end: Some(record.subscription_end),
            ..Self::not_subscribed()
        };

        match record.status {
            SubscriptionStatus::Expired => Self {
                expired: true,
                message: Some("Subscription expired".to_string()),
                ..revoked
            },
            SubscriptionStatus::Cancelled => Self {
                cancelled: true,
                message: Some("Subscription cancelled".to_string()),
                ..revoked
            },
            SubscriptionStatus::Active => Self {
                is_premium: true,
                is_verified: true,
                days_remaining: Some(days_remaining(record.subscription_end, now)),
                next_payment: record.plan.next_payment(record.last_payment),
                features: record.plan.features(),
                message: None,
                ..revoked
            },
        }
    }
}

/// Whole days left, rounded up.
fn days_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const SECS_PER_DAY: i64 = 86_400;
    let secs = (end - now).num_seconds().max(0);
    (secs + SECS_PER_DAY - 1) / SECS_PER_DAY
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
    pub refund_eligible: bool,
    pub cancelled_at: DateTime<Utc>,
}

// == Subscription Manager ==
pub struct SubscriptionManager {
    records: RwLock<SubscriptionMap>,
    /// One async mutex per user; serializes subscribe and cancel per user
    user_locks: UserLockMap,
    repository: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserDirectory>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    settings: PremiumSettings,
}

impl SubscriptionManager {
    /// Builds a manager primed with whatever `repository` currently holds.
    pub async fn load(
        repository: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserDirectory>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        settings: PremiumSettings,
    ) -> Result<Self> {
        let records = repository.load_all().await?;
        info!(count = records.len(), "Loaded subscription records");

        Ok(Self {
            records: RwLock::new(records),
            user_locks: Mutex::new(HashMap::new()),
            repository,
            users,
            gateway,
            clock,
            settings,
        })
    }

    pub fn settings(&self) -> &PremiumSettings {
        &self.settings
    }

    // == Subscribe ==
    /// Charges `user_id` for `plan` and records an active subscription.
    ///
    /// Fails with `UserNotFound` for unknown users and propagates gateway
    /// declines and timeouts untouched. Nothing is retried. Once the charge
    /// has gone through the outcome is returned even if persisting it fails.
    pub async fn subscribe(
        &self,
        user_id: &str,
        plan: Plan,
        payment: &PaymentData,
    ) -> Result<SubscribeOutcome> {
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        let _lock = self.lock_user(user_id).await;

        let timeout = self.settings.payment_timeout;
        let payment_result = tokio::time::timeout(
            timeout,
            self.gateway
                .process_payment(&payment.payment_method_id, plan, &user),
        )
        .await
        .map_err(|_| {
            warn!(user_id, ?timeout, "Payment gateway timed out");
            AppError::PaymentTimeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        })??;

        let now = self.clock.now();
        let subscription_end = plan.subscription_end(now)?;
        let record = SubscriptionRecord::activate(&user, &payment_result, now, subscription_end);

        {
            let mut records = self.records.write().await;
            records.insert(user_id.to_string(), record.clone());
            self.persist(&records).await;
        }

        info!(user_id, %plan, %subscription_end, "Subscription activated");
        info!(email = %user.email, "Sending welcome notice");

        Ok(SubscribeOutcome {
            success: true,
            subscription: record,
            payment: payment_result,
            message: WELCOME_MESSAGE.to_string(),
        })
    }

    // == Check Status ==
    /// Reports entitlements for `user_id` as of now.
    ///
    /// This is the only place expiry is enforced: an active record found past
    /// its end date is flipped to expired and persisted. Later calls see the
    /// expired record and do not write again.
    pub async fn check_status(&self, user_id: &str) -> Result<StatusReport> {
        let now = self.clock.now();

        {
            let records = self.records.read().await;
            match records.get(user_id) {
                None => return Ok(StatusReport::not_subscribed()),
                Some(record) if !record.is_past_due(now) => {
                    return Ok(StatusReport::for_record(record, now));
                }
                Some(_) => {}
            }
        }

        let mut records = self.records.write().await;
        let flipped = records
            .get_mut(user_id)
            .is_some_and(|record| record.expire(now));
        if flipped {
            info!(user_id, "Subscription expired");
            self.persist(&records).await;
        }

        Ok(records
            .get(user_id)
            .map(|record| StatusReport::for_record(record, now))
            .unwrap_or_else(StatusReport::not_subscribed))
    }

    // == Cancel ==
    /// Revokes entitlements immediately, with no grace period.
    ///
    /// Refund eligibility is reported alongside but has no effect on the
    /// cancellation itself.
    pub async fn cancel(&self, user_id: &str) -> Result<CancelOutcome> {
        if !self.records.read().await.contains_key(user_id) {
            return Err(AppError::SubscriptionNotFound(user_id.to_string()));
        }

        let _lock = self.lock_user(user_id).await;

        let now = self.clock.now();
        let mut records = self.records.write().await;
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AppError::SubscriptionNotFound(user_id.to_string()))?;

        record.cancel(now);
        let refund_eligible = is_refund_eligible(record, now, self.settings.refund_window_days);
        let cancelled_at = record.cancelled_at.unwrap_or(now);
        let email = record.email.clone();

        self.persist(&records).await;

        info!(user_id, refund_eligible, "Subscription cancelled");
        info!(%email, "Sending cancellation notice");

        Ok(CancelOutcome {
            success: true,
            message: CANCELLED_MESSAGE.to_string(),
            refund_eligible,
            cancelled_at,
        })
    }

    /// Entitlements a plan grants.
    pub fn features(&self, plan: Plan) -> Vec<Feature> {
        plan.features()
    }

    /// Stored record for `user_id`, as last written. Expiry is not evaluated.
    pub async fn subscription(&self, user_id: &str) -> Option<SubscriptionRecord> {
        self.records.read().await.get(user_id).cloned()
    }

    /// Writes the whole map. The in-memory map stays authoritative when the
    /// write fails; the next successful save carries the change.
    async fn persist(&self, records: &SubscriptionMap) {
        if let Err(err) = self.repository.save_all(records).await {
            warn!(error = %err, count = records.len(), "Failed to persist subscription records");
        }
    }

    async fn lock_user(&self, user_id: &str) -> UserLock<'_> {
        let lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(user_id.to_string()).or_default().clone()
        };

        UserLock {
            locks: &self.user_locks,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

type UserLockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

// == User Lock ==
/// Exclusive hold on one user's writes. The map entry is dropped together
/// with the last holder or waiter.
struct UserLock<'a> {
    locks: &'a UserLockMap,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock<'_> {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}
