//! Premium Module
//!
//! Mock subscription manager: plans, records, persistence and the user
//! directory it resolves accounts from.

mod manager;
mod plan;
mod record;
mod repository;
mod users;

pub use manager::{
    CancelOutcome, PaymentData, PremiumSettings, StatusReport, SubscribeOutcome,
    SubscriptionManager, CANCELLED_MESSAGE, WELCOME_MESSAGE,
};
pub use plan::{Feature, Plan, CURRENCY};
pub use record::{is_refund_eligible, SubscriptionRecord, SubscriptionStatus};
pub use repository::{
    InMemoryRepository, JsonFileRepository, SubscriptionMap, SubscriptionRepository, STORE_KEY,
};
pub use users::{InMemoryUserDirectory, User, UserDirectory};
