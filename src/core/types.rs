//! Domain enums shared across flows, storage and the Telegram binding.
//!
//! Everything here round-trips through its storage string (strum), so the
//! same vocabulary appears in callback payloads, SQLite rows and snapshots.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Gaming platform a user sells coins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Playstation,
    Xbox,
    Pc,
}

impl Platform {
    /// Human-readable label used in outbound messages and keyboards.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Playstation => "🎮 PlayStation",
            Platform::Xbox => "🎮 Xbox",
            Platform::Pc => "🖥️ PC",
        }
    }
}

/// How fast the seller gets paid after handing over coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    /// Payout within 24 hours, quoted higher
    Normal,
    /// Payout within the hour, quoted lower
    Instant,
}

impl TransferType {
    pub fn label(&self) -> &'static str {
        match self {
            TransferType::Normal => "📅 عادي (خلال 24 ساعة)",
            TransferType::Instant => "⚡ فوري (خلال ساعة)",
        }
    }
}

/// Payment channels accepted for payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    VodafoneCash,
    EtisalatCash,
    OrangeCash,
    WeCash,
    BankWallet,
    Telda,
    Instapay,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::VodafoneCash => "⭕️ فودافون كاش",
            PaymentMethod::EtisalatCash => "🟢 اتصالات كاش",
            PaymentMethod::OrangeCash => "🍊 أورانج كاش",
            PaymentMethod::WeCash => "🟣 وي كاش",
            PaymentMethod::BankWallet => "🏦 محفظة بنكية",
            PaymentMethod::Telda => "💳 تيلدا",
            PaymentMethod::Instapay => "🔗 إنستا باي",
        }
    }

    /// Mobile-wallet methods all take an 11-digit Egyptian number.
    pub fn is_mobile_wallet(&self) -> bool {
        matches!(
            self,
            PaymentMethod::VodafoneCash
                | PaymentMethod::EtisalatCash
                | PaymentMethod::OrangeCash
                | PaymentMethod::WeCash
                | PaymentMethod::BankWallet
        )
    }

    /// Network prefix the wallet number is expected to start with, where
    /// the method is tied to one carrier.
    pub fn expected_prefix(&self) -> Option<&'static str> {
        match self {
            PaymentMethod::VodafoneCash => Some("010"),
            PaymentMethod::EtisalatCash => Some("011"),
            PaymentMethod::OrangeCash => Some("012"),
            PaymentMethod::WeCash => Some("015"),
            _ => None,
        }
    }
}

/// Persisted checkpoint of how far a user got through registration.
///
/// Stored as text in `users.registration_stage`; the recovery router reads
/// it to decide between "greet as new", "show menu" and "offer resume".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    #[default]
    Start,
    ChoosingPlatform,
    EnteringContact,
    ChoosingPayment,
    EnteringPaymentDetails,
    Completed,
}

impl RegistrationStage {
    pub fn is_completed(&self) -> bool {
        matches!(self, RegistrationStage::Completed)
    }

    /// An interrupted registration is anything past `Start` that never
    /// reached `Completed`.
    pub fn is_interrupted(&self) -> bool {
        !matches!(self, RegistrationStage::Start | RegistrationStage::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_platform_round_trip() {
        for (s, p) in [
            ("playstation", Platform::Playstation),
            ("xbox", Platform::Xbox),
            ("pc", Platform::Pc),
        ] {
            assert_eq!(Platform::from_str(s).unwrap(), p);
            assert_eq!(p.to_string(), s);
        }
        assert!(Platform::from_str("nintendo").is_err());
    }

    #[test]
    fn test_payment_method_round_trip() {
        assert_eq!(
            PaymentMethod::from_str("vodafone_cash").unwrap(),
            PaymentMethod::VodafoneCash
        );
        assert_eq!(PaymentMethod::Instapay.to_string(), "instapay");
    }

    #[test]
    fn test_stage_classification() {
        assert!(RegistrationStage::Completed.is_completed());
        assert!(!RegistrationStage::Start.is_interrupted());
        assert!(RegistrationStage::EnteringContact.is_interrupted());
        assert_eq!(
            RegistrationStage::from_str("entering_contact").unwrap(),
            RegistrationStage::EnteringContact
        );
    }

    #[test]
    fn test_wallet_prefixes() {
        assert_eq!(PaymentMethod::VodafoneCash.expected_prefix(), Some("010"));
        assert_eq!(PaymentMethod::Telda.expected_prefix(), None);
        assert!(PaymentMethod::BankWallet.is_mobile_wallet());
        assert!(!PaymentMethod::Instapay.is_mobile_wallet());
    }
}
