use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::{Payment, PaymentMethod, PaymentStatus};
use ferry_shared::pii::mask_card_number;
use ferry_shared::Masked;
use serde::Deserialize;

use crate::manager::BookingError;

/// Payment details as submitted on the payment step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentInput {
    /// `slip` names the uploaded transfer receipt, if one was attached.
    BankTransfer {
        #[serde(default)]
        slip: Option<String>,
    },
    Card {
        number: Masked<String>,
        /// `MM/YY`
        expiry: String,
    },
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
}

impl PaymentInput {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentInput::BankTransfer { .. } => PaymentMethod::BankTransfer,
            PaymentInput::Card { .. } => PaymentMethod::Card,
            PaymentInput::Stripe => PaymentMethod::Stripe,
            PaymentInput::PayPal => PaymentMethod::PayPal,
        }
    }

    /// Turn the submission into the stored payment. Card numbers are reduced
    /// to their last four digits here and nowhere else.
    pub fn into_payment(
        self,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Payment, BookingError> {
        let method = self.method();
        let (status, info) = match self {
            PaymentInput::BankTransfer { slip } => {
                let info = slip
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{}_{}", reference, s));
                (PaymentStatus::Pending, info)
            }
            PaymentInput::Card { number, expiry } => {
                let masked = mask_card_number(number.expose()).ok_or_else(|| {
                    BookingError::BookingInvalid(
                        "card number must contain at least 4 digits".to_string(),
                    )
                })?;
                let expiry = validate_expiry(&expiry)?;
                (PaymentStatus::Paid, Some(format!("card:{} exp:{}", masked, expiry)))
            }
            PaymentInput::Stripe | PaymentInput::PayPal => {
                (PaymentStatus::Redirected, Some(method.label().to_string()))
            }
        };

        Ok(Payment {
            method,
            status,
            info,
            recorded_at: now,
        })
    }
}

fn validate_expiry(raw: &str) -> Result<String, BookingError> {
    let trimmed = raw.trim();
    // Day is irrelevant; pin it to the first so chrono can check the month
    NaiveDate::parse_from_str(&format!("01/{}", trimmed), "%d/%m/%y")
        .map_err(|_| {
            BookingError::BookingInvalid(format!("invalid card expiry '{}', expected MM/YY", raw))
        })?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_bank_transfer_is_pending_with_slip() {
        let payment = PaymentInput::BankTransfer { slip: Some("receipt.png".to_string()) }
            .into_payment("AB12CD34", now())
            .unwrap();
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.info.as_deref(), Some("AB12CD34_receipt.png"));

        let payment =
            PaymentInput::BankTransfer { slip: None }.into_payment("AB12CD34", now()).unwrap();
        assert!(payment.info.is_none());
    }

    #[test]
    fn test_card_is_paid_and_masked() {
        let payment = PaymentInput::Card {
            number: Masked::new("4242 4242 4242 4242".to_string()),
            expiry: "12/27".to_string(),
        }
        .into_payment("AB12CD34", now())
        .unwrap();

        assert_eq!(payment.status, PaymentStatus::Paid);
        let info = payment.info.unwrap();
        assert_eq!(info, "card:**** **** **** 4242 exp:12/27");
        assert!(!info.contains("4242 4242"));
    }

    #[test]
    fn test_card_validation() {
        let short = PaymentInput::Card {
            number: Masked::new("42".to_string()),
            expiry: "12/27".to_string(),
        };
        assert!(matches!(short.into_payment("X", now()), Err(BookingError::BookingInvalid(_))));

        let bad_expiry = PaymentInput::Card {
            number: Masked::new("4111111111111111".to_string()),
            expiry: "13/27".to_string(),
        };
        assert!(matches!(
            bad_expiry.into_payment("X", now()),
            Err(BookingError::BookingInvalid(_))
        ));
    }

    #[test]
    fn test_redirect_methods() {
        let payment = PaymentInput::PayPal.into_payment("X", now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Redirected);
        assert_eq!(payment.info.as_deref(), Some("PayPal"));
    }

    #[test]
    fn test_deserialize_tagged_input() {
        let input: PaymentInput = serde_json::from_str(
            r#"{"method":"card","number":"4000 0000 0000 0002","expiry":"01/30"}"#,
        )
        .unwrap();
        assert_eq!(input.method(), PaymentMethod::Card);
        // Debug output never shows the number
        assert!(!format!("{:?}", input).contains("0002"));

        let input: PaymentInput = serde_json::from_str(r#"{"method":"bank_transfer"}"#).unwrap();
        assert_eq!(input.method(), PaymentMethod::BankTransfer);
    }
}
