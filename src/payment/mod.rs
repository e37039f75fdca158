//! Payment Module
//!
//! Mock payment simulator: card validation, a simulated gateway and an IP
//! risk placeholder. Nothing here charges a card or scores fraud.

mod card;
mod gateway;
mod risk;

pub use card::{
    luhn_valid, payment_method_id_for_card, validate_card, CardRejection, TEST_CARD_NUMBERS,
};
pub use gateway::{
    is_flagged, MockPaymentGateway, PaymentGateway, PaymentResult, BANK_DECLINE_MESSAGE,
    FRAUD_DECLINE_MESSAGE, FRAUD_MARKERS,
};
pub use risk::{
    looks_private, CachedIpRiskCheck, HeuristicVpnCheck, IpRiskCheck, VpnCheck, MAX_IP_LENGTH,
    NO_VPN_MESSAGE, VPN_DETECTED_MESSAGE,
};
