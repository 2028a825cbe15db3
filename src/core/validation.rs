//! Input validation for free-text entry steps
//!
//! Every validator distinguishes *why* input was rejected, because the
//! corrective message differs: letters in a number get different guidance
//! than a wrong digit count, which differs again from an out-of-range
//! value. Flow handlers map each variant to its own user-facing text and
//! stay in the same state.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::core::config::{amount, price};
use crate::core::types::PaymentMethod;

/// Egyptian mobile number: 11 digits starting 010/011/012/015.
static EGYPT_MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^01[0125][0-9]{8}$").unwrap());

/// Anything that is not a digit or benign spacing in a phone entry.
static NON_DIGIT_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d\s\-]").unwrap());

/// InstaPay link somewhere inside arbitrary text.
static INSTAPAY_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:https?://)?[^\s]*(?:instapay\.com\.eg|ipn\.eg)[^\s]*").unwrap());

/// Why a free-text phone entry was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    /// Input contains letters or symbols
    #[error("phone input contains non-digit characters")]
    NonDigit,
    /// Cleaned input is not 11 digits
    #[error("phone number has {0} digits, expected 11")]
    WrongLength(usize),
    /// 11 digits but not an Egyptian mobile prefix
    #[error("phone number does not start with 010/011/012/015")]
    BadPrefix,
}

/// Why a numeric entry (coin amount, catalog price) was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberError {
    /// Contains letters or symbols
    #[error("input is not all digits")]
    NotDigits,
    /// Below the allowed minimum
    #[error("value {value} below minimum {min}")]
    TooLow { value: i64, min: i64 },
    /// Above the allowed maximum
    #[error("value {value} above maximum {max}")]
    TooHigh { value: i64, max: i64 },
}

/// Why a payment-details entry was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentDetailsError {
    #[error("wallet number contains non-digit characters")]
    NonDigit,
    #[error("wallet number has {0} digits, expected 11")]
    WrongLength(usize),
    #[error("wallet number does not start with 010/011/012/015")]
    BadPrefix,
    #[error("card number has {0} digits, expected 16")]
    BadCardLength(usize),
    #[error("no InstaPay link found in input")]
    NoInstapayUrl,
}

/// Validated payment details plus any advisory note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    /// Canonical stored form (digits only, or a normalized URL)
    pub cleaned: String,
    /// Non-fatal warning, e.g. wallet number on an unexpected carrier
    pub warning: Option<String>,
}

/// Validates a contact (WhatsApp) number.
///
/// Spacing and dashes are tolerated and stripped; anything else non-digit
/// is a format error, not a length error.
pub fn validate_contact(input: &str) -> Result<String, PhoneError> {
    let trimmed = input.trim();
    if NON_DIGIT_NOISE.is_match(trimmed) {
        return Err(PhoneError::NonDigit);
    }

    let cleaned: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.len() != 11 {
        return Err(PhoneError::WrongLength(cleaned.len()));
    }
    if !EGYPT_MOBILE.is_match(&cleaned) {
        return Err(PhoneError::BadPrefix);
    }
    Ok(cleaned)
}

/// Validates a coin amount entered during the sale flow.
pub fn validate_amount(input: &str) -> Result<i64, NumberError> {
    parse_bounded(input, amount::MIN_COINS, amount::MAX_COINS)
}

/// Validates a catalog price entered during the admin flow.
pub fn validate_price(input: &str) -> Result<i64, NumberError> {
    parse_bounded(input, price::MIN_PRICE, price::MAX_PRICE)
}

/// Checks that an already-parsed price sits inside the catalog bounds.
/// The ledger re-checks at its boundary so no caller can bypass it.
pub fn check_price_bounds(value: i64) -> Result<i64, NumberError> {
    if value < price::MIN_PRICE {
        return Err(NumberError::TooLow {
            value,
            min: price::MIN_PRICE,
        });
    }
    if value > price::MAX_PRICE {
        return Err(NumberError::TooHigh {
            value,
            max: price::MAX_PRICE,
        });
    }
    Ok(value)
}

fn parse_bounded(input: &str, min: i64, max: i64) -> Result<i64, NumberError> {
    let trimmed = input.trim();
    // Thousands separators are common in pasted prices; strip them before
    // deciding the input is non-numeric.
    let cleaned: String = trimmed.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(NumberError::NotDigits);
    }
    let value: i64 = cleaned.parse().map_err(|_| NumberError::NotDigits)?;
    if value < min {
        return Err(NumberError::TooLow { value, min });
    }
    if value > max {
        return Err(NumberError::TooHigh { value, max });
    }
    Ok(value)
}

/// Validates payment details for the chosen method.
pub fn validate_payment_details(method: PaymentMethod, input: &str) -> Result<PaymentDetails, PaymentDetailsError> {
    match method {
        PaymentMethod::VodafoneCash
        | PaymentMethod::EtisalatCash
        | PaymentMethod::OrangeCash
        | PaymentMethod::WeCash
        | PaymentMethod::BankWallet => validate_wallet_number(method, input),
        PaymentMethod::Telda => validate_telda_card(input),
        PaymentMethod::Instapay => validate_instapay(input),
    }
}

fn validate_wallet_number(method: PaymentMethod, input: &str) -> Result<PaymentDetails, PaymentDetailsError> {
    let trimmed = input.trim();
    if NON_DIGIT_NOISE.is_match(trimmed) {
        return Err(PaymentDetailsError::NonDigit);
    }
    let cleaned: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.len() != 11 {
        return Err(PaymentDetailsError::WrongLength(cleaned.len()));
    }
    if !EGYPT_MOBILE.is_match(&cleaned) {
        return Err(PaymentDetailsError::BadPrefix);
    }

    // Number on a different carrier than the wallet still works, but the
    // user probably mistyped; warn instead of rejecting.
    let warning = method.expected_prefix().and_then(|prefix| {
        if cleaned.starts_with(prefix) {
            None
        } else {
            Some(format!("⚠️ الرقم لا يطابق شبكة {}", method.label()))
        }
    });

    Ok(PaymentDetails { cleaned, warning })
}

fn validate_telda_card(input: &str) -> Result<PaymentDetails, PaymentDetailsError> {
    let trimmed = input.trim();
    if NON_DIGIT_NOISE.is_match(trimmed) {
        return Err(PaymentDetailsError::NonDigit);
    }
    let cleaned: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.len() != 16 {
        return Err(PaymentDetailsError::BadCardLength(cleaned.len()));
    }
    Ok(PaymentDetails {
        cleaned,
        warning: None,
    })
}

fn validate_instapay(input: &str) -> Result<PaymentDetails, PaymentDetailsError> {
    let found = INSTAPAY_URL
        .find(input.trim())
        .ok_or(PaymentDetailsError::NoInstapayUrl)?;

    let mut candidate = found.as_str().trim_end_matches(['.', ',', '؛', '!']).to_string();
    if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
        candidate = format!("https://{candidate}");
    }

    // The regex is permissive; a final parse rejects garbage around the
    // domain (spaces already excluded, but malformed ports etc. are not).
    let parsed = Url::parse(&candidate).map_err(|_| PaymentDetailsError::NoInstapayUrl)?;
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    if !host.ends_with("instapay.com.eg") && !host.ends_with("ipn.eg") {
        return Err(PaymentDetailsError::NoInstapayUrl);
    }

    Ok(PaymentDetails {
        cleaned: candidate,
        warning: None,
    })
}
