//! Payment gateway
//!
//! `PaymentGateway` is the seam where a hosted provider would plug in.
//! `MockPaymentGateway` simulates one: latency, blocklist declines and an
//! optional random decline rate. No money moves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{AppError, Result};
use crate::premium::{Plan, User, CURRENCY};

/// Substrings in a payment-method identifier that trigger a fraud decline.
pub const FRAUD_MARKERS: [&str; 3] = ["test", "fake", "4242424242424242"];

pub const FRAUD_DECLINE_MESSAGE: &str = "Payment declined: Fraud detected";
pub const BANK_DECLINE_MESSAGE: &str = "Payment declined by bank";

// == Payment Result ==
/// Outcome of a successful charge. Declines are reported as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub success: bool,
    pub payment_id: String,
    /// Minor currency units
    pub amount: u64,
    pub currency: String,
    pub plan: Plan,
    pub subscription_end: DateTime<Utc>,
}

// == Gateway Trait ==
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `user` for `plan` using a previously tokenized payment method.
    async fn process_payment(
        &self,
        payment_method_id: &str,
        plan: Plan,
        user: &User,
    ) -> Result<PaymentResult>;
}

// == Mock Gateway ==
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    latency: Duration,
    decline_rate: f64,
    clock: Arc<dyn Clock>,
}

impl MockPaymentGateway {
    /// `decline_rate` is the probability in `[0, 1]` of a random bank decline
    /// for an otherwise clean identifier.
    pub fn new(latency: Duration, decline_rate: f64) -> Self {
        Self::with_clock(latency, decline_rate, Arc::new(SystemClock))
    }

    pub fn with_clock(latency: Duration, decline_rate: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            latency,
            decline_rate: decline_rate.clamp(0.0, 1.0),
            clock,
        }
    }

    /// Zero latency, deterministic outcomes.
    pub fn instant(clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(Duration::ZERO, 0.0, clock)
    }
}

/// Whether an identifier carries one of the blocklisted fraud markers.
pub fn is_flagged(payment_method_id: &str) -> bool {
    FRAUD_MARKERS
        .iter()
        .any(|marker| payment_method_id.contains(marker))
}

fn payment_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("pay_{}_{}", now.timestamp_millis(), suffix)
}

fn roll_decline(rate: f64) -> bool {
    rate > 0.0 && rand::rng().random_bool(rate)
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn process_payment(
        &self,
        payment_method_id: &str,
        plan: Plan,
        user: &User,
    ) -> Result<PaymentResult> {
        info!(user_id = %user.id, %plan, "Processing payment");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if is_flagged(payment_method_id) {
            warn!(user_id = %user.id, "Payment declined: blocklisted payment method");
            return Err(AppError::PaymentDeclined(FRAUD_DECLINE_MESSAGE.to_string()));
        }

        if roll_decline(self.decline_rate) {
            warn!(user_id = %user.id, "Payment declined: simulated bank decline");
            return Err(AppError::PaymentDeclined(BANK_DECLINE_MESSAGE.to_string()));
        }

        let now = self.clock.now();
        let result = PaymentResult {
            success: true,
            payment_id: payment_id(now),
            amount: plan.price_cents(),
            currency: CURRENCY.to_string(),
            plan,
            subscription_end: plan.subscription_end(now)?,
        };

        info!(
            user_id = %user.id,
            payment_id = %result.payment_id,
            amount = result.amount,
            "Payment succeeded"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    fn demo_user() -> User {
        User {
            id: "1".to_string(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
        }
    }

    fn gateway() -> (MockPaymentGateway, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MockPaymentGateway::instant(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_clean_identifier_succeeds() {
        let (gateway, clock) = gateway();

        let result = gateway
            .process_payment("pm_1700000000000_1486", Plan::Yearly, &demo_user())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.amount, 9999);
        assert_eq!(result.currency, "USD");
        assert_eq!(result.plan, Plan::Yearly);
        assert!(result.payment_id.starts_with("pay_"));
        assert_eq!(
            result.subscription_end,
            Plan::Yearly.subscription_end(clock.now()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fraud_markers_decline() {
        let (gateway, _) = gateway();

        for id in ["pm_test_1", "fake-card", "pm_4242424242424242"] {
            let err = gateway
                .process_payment(id, Plan::Monthly, &demo_user())
                .await
                .unwrap_err();
            assert!(
                matches!(&err, AppError::PaymentDeclined(msg) if msg == FRAUD_DECLINE_MESSAGE),
                "{} should be declined, got {:?}",
                id,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_certain_bank_decline() {
        let clock = Arc::new(ManualClock::starting_now());
        let gateway = MockPaymentGateway::with_clock(Duration::ZERO, 1.0, clock);

        let err = gateway
            .process_payment("pm_clean", Plan::Monthly, &demo_user())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentDeclined(msg) if msg == BANK_DECLINE_MESSAGE));
    }

    #[tokio::test]
    async fn test_payment_ids_are_distinct() {
        let (gateway, _) = gateway();
        let user = demo_user();

        let a = gateway.process_payment("pm_a", Plan::Monthly, &user).await.unwrap();
        let b = gateway.process_payment("pm_b", Plan::Monthly, &user).await.unwrap();
        assert_ne!(a.payment_id, b.payment_id);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Any identifier containing "test" is declined.
        #[test]
        fn prop_test_marker_always_declines(prefix in "[a-z0-9_]{0,12}", suffix in "[a-z0-9_]{0,12}") {
            let (gateway, _) = gateway();
            let id = format!("{}test{}", prefix, suffix);

            let result = tokio_test::block_on(gateway.process_payment(&id, Plan::Monthly, &demo_user()));
            prop_assert!(matches!(result, Err(AppError::PaymentDeclined(_))));
        }

        // Clean identifiers are charged exactly the plan's list price.
        #[test]
        fn prop_clean_identifier_charges_list_price(
            id in "pm_[0-9]{4,13}_[0-9]{4}",
            plan in prop::sample::select(Plan::ALL.to_vec())
        ) {
            let (gateway, _) = gateway();
            prop_assume!(!is_flagged(&id));

            let result = tokio_test::block_on(gateway.process_payment(&id, plan, &demo_user())).unwrap();
            prop_assert_eq!(result.amount, plan.price_cents());
            prop_assert_eq!(result.plan, plan);
        }
    }
}
