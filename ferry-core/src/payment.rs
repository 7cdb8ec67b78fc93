use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Card => "Card",
            PaymentMethod::Stripe => "Stripe",
            PaymentMethod::PayPal => "PayPal",
        }
    }

    /// Methods that hand the customer over to a third party and wait for it
    /// to confirm.
    pub fn is_redirect(&self) -> bool {
        matches!(self, PaymentMethod::Stripe | PaymentMethod::PayPal)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "card" => Ok(PaymentMethod::Card),
            "stripe" => Ok(PaymentMethod::Stripe),
            "paypal" => Ok(PaymentMethod::PayPal),
            _ => Err(CoreError::ValidationError(format!("unknown payment method '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Waiting for an admin to confirm a bank transfer.
    Pending,
    Paid,
    /// Sent to a third-party checkout, waiting for its confirmation.
    Redirected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Redirected => "redirected",
        }
    }

    pub fn awaiting_confirmation(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Redirected)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "redirected" => Ok(PaymentStatus::Redirected),
            _ => Err(CoreError::ValidationError(format!("unknown payment status '{}'", s))),
        }
    }
}

/// Payment recorded against a booking. `info` holds the bank slip
/// reference, the masked card, or the redirect provider; never a full card number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub info: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("Bank Transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!("PayPal".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayPal);
        assert!("cash".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_status_round_trips_through_str() {
        for status in [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Redirected] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!(PaymentStatus::Pending.awaiting_confirmation());
        assert!(!PaymentStatus::Paid.awaiting_confirmation());
    }
}
