//! Subscription plans
//!
//! Price table, entitlement window and feature list for each tier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Settlement currency for every plan.
pub const CURRENCY: &str = "USD";

// == Plan ==
/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Yearly,
    Lifetime,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Monthly, Plan::Yearly, Plan::Lifetime];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
            Plan::Lifetime => "lifetime",
        }
    }

    /// Price in minor currency units (cents).
    pub fn price_cents(&self) -> u64 {
        match self {
            Plan::Monthly => 999,
            Plan::Yearly => 9_999,
            Plan::Lifetime => 29_999,
        }
    }

    /// Length of the entitlement window. Lifetime is modelled as 100 years.
    fn term(&self) -> Months {
        match self {
            Plan::Monthly => Months::new(1),
            Plan::Yearly => Months::new(12),
            Plan::Lifetime => Months::new(12 * 100),
        }
    }

    /// End of a subscription window that opens at `start`.
    ///
    /// Uses calendar months, so Jan 31 + 1 month lands on the last day of
    /// February.
    pub fn subscription_end(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
        start.checked_add_months(self.term()).ok_or_else(|| {
            AppError::Internal(format!("{} term overflows from {}", self, start))
        })
    }

    /// When the next renewal charge falls due, counted from the last payment.
    /// Lifetime plans never renew.
    pub fn next_payment(&self, last_payment: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Plan::Lifetime => None,
            _ => last_payment.checked_add_months(self.term()),
        }
    }

    /// Entitlements unlocked by this plan.
    pub fn features(&self) -> Vec<Feature> {
        let mut features = vec![
            Feature::VerifiedBadge,
            Feature::ProfileEffects,
            Feature::PrioritySupport,
            Feature::AdFree,
            Feature::EnhancedSecurity,
        ];

        if matches!(self, Plan::Yearly | Plan::Lifetime) {
            features.extend([Feature::ExclusiveFilters, Feature::AdvancedAnalytics]);
        }
        if matches!(self, Plan::Lifetime) {
            features.extend([Feature::VipStatus, Feature::LifetimeUpdates]);
        }
        features
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            "lifetime" => Ok(Plan::Lifetime),
            other => Err(AppError::InvalidRequest(format!("Unknown plan: {}", other))),
        }
    }
}

// == Feature ==
/// Capability flag derived from an active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    VerifiedBadge,
    ProfileEffects,
    PrioritySupport,
    AdFree,
    EnhancedSecurity,
    ExclusiveFilters,
    AdvancedAnalytics,
    VipStatus,
    LifetimeUpdates,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_price_table() {
        assert_eq!(Plan::Monthly.price_cents(), 999);
        assert_eq!(Plan::Yearly.price_cents(), 9999);
        assert_eq!(Plan::Lifetime.price_cents(), 29999);
    }

    #[test]
    fn test_subscription_end_by_plan() {
        let start = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();

        assert_eq!(
            Plan::Monthly.subscription_end(start).unwrap(),
            Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Plan::Yearly.subscription_end(start).unwrap(),
            Utc.with_ymd_and_hms(2027, 3, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Plan::Lifetime.subscription_end(start).unwrap(),
            Utc.with_ymd_and_hms(2126, 3, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_end_clamps_to_month_length() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            Plan::Monthly.subscription_end(start).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_payment() {
        let paid = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();

        assert_eq!(
            Plan::Monthly.next_payment(paid),
            Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            Plan::Yearly.next_payment(paid),
            Some(Utc.with_ymd_and_hms(2027, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(Plan::Lifetime.next_payment(paid), None);
    }

    #[test]
    fn test_features_grow_with_tier() {
        let monthly = Plan::Monthly.features();
        let yearly = Plan::Yearly.features();
        let lifetime = Plan::Lifetime.features();

        assert_eq!(monthly.len(), 5);
        assert_eq!(yearly.len(), 7);
        assert_eq!(lifetime.len(), 9);
        assert!(monthly.iter().all(|f| yearly.contains(f)));
        assert!(yearly.iter().all(|f| lifetime.contains(f)));
        assert!(lifetime.contains(&Feature::VipStatus));
        assert!(!yearly.contains(&Feature::VipStatus));
    }

    #[test]
    fn test_plan_parse_and_serde() {
        assert_eq!("yearly".parse::<Plan>().unwrap(), Plan::Yearly);
        assert!("weekly".parse::<Plan>().is_err());

        let json = serde_json::to_string(&Plan::Lifetime).unwrap();
        assert_eq!(json, "\"lifetime\"");
        let plan: Plan = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(plan, Plan::Monthly);
    }
}
