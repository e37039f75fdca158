//! Card validation
//!
//! Format, checksum and expiry checks for card-like input. Nothing here talks
//! to an issuer; a passing card is merely well-formed.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

/// Publicly documented processor test numbers. They pass Luhn, so they are
/// refused explicitly.
pub const TEST_CARD_NUMBERS: [&str; 4] = [
    "4242424242424242",
    "4000056655665556",
    "5555555555554444",
    "4111111111111111",
];

const CARD_NUMBER_LENGTH: usize = 16;

// == Card Rejection ==
/// First failing check for a card. Messages are shown to users as-is.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardRejection {
    #[error("Invalid card number")]
    InvalidNumber,
    #[error("Invalid card number checksum")]
    FailedChecksum,
    #[error("Invalid expiry date")]
    MalformedExpiry,
    #[error("Invalid expiry month")]
    InvalidExpiryMonth,
    #[error("Card expired")]
    Expired,
    #[error("Invalid CVC")]
    InvalidCvc,
    #[error("Test cards are not accepted")]
    TestCard,
}

// == Validate Card ==
/// Validates card input against `today`.
///
/// Whitespace in `number` is ignored. Checks run in a fixed order and the
/// first failure wins: length and digits, Luhn, expiry, CVC, test-card list.
pub fn validate_card(
    number: &str,
    expiry: &str,
    cvc: &str,
    today: NaiveDate,
) -> Result<(), CardRejection> {
    let digits = normalize_number(number);

    if digits.len() != CARD_NUMBER_LENGTH || !is_ascii_digits(&digits) {
        return Err(CardRejection::InvalidNumber);
    }

    if !luhn_valid(&digits) {
        return Err(CardRejection::FailedChecksum);
    }

    check_expiry(expiry, today)?;

    if !(3..=4).contains(&cvc.len()) || !is_ascii_digits(cvc) {
        return Err(CardRejection::InvalidCvc);
    }

    if TEST_CARD_NUMBERS.contains(&digits.as_str()) {
        return Err(CardRejection::TestCard);
    }

    Ok(())
}

// == Luhn ==
/// Luhn checksum over a string of ASCII digits.
///
/// Returns false for empty input or any non-digit character.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// Opaque payment-method identifier for a card: `pm_<unix-ms>_<last4>`.
///
/// Only the last four digits leave this function.
pub fn payment_method_id_for_card(number: &str, now: DateTime<Utc>) -> String {
    let digits = normalize_number(number);
    let last4 = &digits[digits.len().saturating_sub(4)..];
    format!("pm_{}_{}", now.timestamp_millis(), last4)
}

fn normalize_number(number: &str) -> String {
    number.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Accepts `MM/YY` or `MM/YYYY`. A card is good through the end of its
/// expiry month.
fn check_expiry(expiry: &str, today: NaiveDate) -> Result<(), CardRejection> {
    let (month, year) = expiry
        .trim()
        .split_once('/')
        .ok_or(CardRejection::MalformedExpiry)?;
    let (month, year) = (month.trim(), year.trim());

    if !is_ascii_digits(month) || month.len() > 2 || !is_ascii_digits(year) {
        return Err(CardRejection::MalformedExpiry);
    }
    let month: u32 = month.parse().map_err(|_| CardRejection::MalformedExpiry)?;
    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().map_err(|_| CardRejection::MalformedExpiry)?,
        4 => year.parse().map_err(|_| CardRejection::MalformedExpiry)?,
        _ => return Err(CardRejection::MalformedExpiry),
    };

    if !(1..=12).contains(&month) {
        return Err(CardRejection::InvalidExpiryMonth);
    }

    if (year, month) < (today.year(), today.month()) {
        return Err(CardRejection::Expired);
    }

    Ok(())
}
