//! Subscription records
//!
//! Persisted per-user subscription state and the transitions allowed on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payment::PaymentResult;
use crate::premium::{Plan, User};

/// Lifecycle of a subscription. `Expired` and `Cancelled` both revoke
/// entitlements but are kept apart so the reason is reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub email: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub subscription_start: DateTime<Utc>,
    pub subscription_end: DateTime<Utc>,
    pub is_premium: bool,
    pub is_verified: bool,
    pub payment_id: String,
    pub last_payment: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    /// Fresh active record for a settled payment, entitled until
    /// `subscription_end`.
    pub fn activate(
        user: &User,
        payment: &PaymentResult,
        now: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            plan: payment.plan,
            status: SubscriptionStatus::Active,
            subscription_start: now,
            subscription_end,
            is_premium: true,
            is_verified: true,
            payment_id: payment.payment_id.clone(),
            last_payment: now,
            cancelled_at: None,
            expired_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Active but past its end date at `now`.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.subscription_end
    }

    /// ACTIVE → EXPIRED. No-op in any other state.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = SubscriptionStatus::Expired;
        self.is_premium = false;
        self.is_verified = false;
        self.expired_at = Some(now);
        true
    }

    /// Revokes entitlements immediately. The first cancellation time sticks.
    /// An already expired record keeps its expiry as the reason.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        if self.is_active() {
            self.status = SubscriptionStatus::Cancelled;
        }
        self.is_premium = false;
        self.is_verified = false;
        self.cancelled_at.get_or_insert(now);
    }

    /// Whole days elapsed since the subscription started.
    pub fn days_since_start(&self, now: DateTime<Utc>) -> i64 {
        (now - self.subscription_start).num_days()
    }
}

/// Refund policy: eligible while no more than `window_days` whole days have
/// passed since the start. Independent of the subscription state.
pub fn is_refund_eligible(record: &SubscriptionRecord, now: DateTime<Utc>, window_days: i64) -> bool {
    record.days_since_start(now) <= window_days
}
