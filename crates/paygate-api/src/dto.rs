//! Request and response DTOs
//!
//! All inbound bodies reject unknown fields; card syntactic checks (Luhn,
//! CVV shape) run as validator predicates before anything reaches the
//! orchestrator.

use chrono::NaiveDate;
use paygate_types::BrowserInfo;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ----------------------------------------------------------------------
// Payment interface
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CardDto {
    #[validate(custom(function = validate_luhn))]
    pub pan: String,
    #[validate(custom(function = validate_cvv))]
    pub cvv: String,
    /// Expiry as YYYY-MM-DD
    pub expire: NaiveDate,
    #[validate(length(min = 1))]
    pub holder: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CardAuthorizeRequest {
    #[validate(length(min = 1))]
    pub order_id: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 1))]
    pub customer: String,
    #[validate(nested)]
    pub card: CardDto,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub threedsver2termurl: Option<String>,
    #[serde(default)]
    pub browser_info: Option<BrowserInfo>,
}

impl CardAuthorizeRequest {
    pub fn into_payment_request(self) -> paygate_core::CardPaymentRequest {
        paygate_core::CardPaymentRequest {
            order_id: self.order_id,
            amount: self.amount,
            customer: self.customer,
            card: paygate_core::CardData {
                pan: self.card.pan,
                cvv: self.card.cvv,
                expire: self.card.expire,
                holder: self.card.holder,
            },
            return_url: self.return_url,
            threedsver2_term_url: self.threedsver2termurl,
            browser_info: self.browser_info,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ConfirmRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReverseRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RefundRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RebillRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProcessParesRequest {
    #[validate(length(min = 1))]
    pub pares: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProcessCresRequest {
    #[validate(length(min = 1))]
    pub cres: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CompleteMethodUrlRequest {
    pub completed: bool,
}

// ----------------------------------------------------------------------
// Administrative interface
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LimitAndOffsetQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub overall: i64,
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCurrencyRequest {
    #[validate(range(min = 1))]
    pub numeric_code: i32,
    #[validate(length(min = 3, max = 3))]
    pub char_code: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0, max = 8))]
    pub exponent: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCurrencyRequest {
    #[serde(default)]
    pub char_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exponent: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1))]
    pub key: String,
    #[serde(default)]
    pub description: String,
    pub currency_code: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency_code: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub rebill_enabled: bool,
    #[serde(default = "default_true")]
    pub refund_enabled: bool,
    #[serde(default = "default_true")]
    pub reversal_enabled: bool,
    #[serde(default)]
    pub partial_confirm_enabled: bool,
    #[serde(default)]
    pub partial_reversal_enabled: bool,
    #[serde(default)]
    pub partial_refund_enabled: bool,
    #[serde(default)]
    pub currency_conversion_enabled: bool,
    pub currency_code: i32,
    #[validate(length(min = 1))]
    pub channel_key: String,
    #[serde(default = "empty_object")]
    pub settings: serde_json::Value,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub is_test: Option<bool>,
    #[serde(default)]
    pub rebill_enabled: Option<bool>,
    #[serde(default)]
    pub refund_enabled: Option<bool>,
    #[serde(default)]
    pub reversal_enabled: Option<bool>,
    #[serde(default)]
    pub partial_confirm_enabled: Option<bool>,
    #[serde(default)]
    pub partial_reversal_enabled: Option<bool>,
    #[serde(default)]
    pub partial_refund_enabled: Option<bool>,
    #[serde(default)]
    pub currency_conversion_enabled: Option<bool>,
    #[serde(default)]
    pub currency_code: Option<i32>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateRouteRequest {
    pub profile_id: i32,
    #[validate(length(min = 1))]
    pub instrument_key: String,
    #[serde(default)]
    pub account_id: Option<i32>,
    #[serde(default)]
    pub router_key: Option<String>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateRouteRequest {
    #[serde(default)]
    pub account_id: Option<i32>,
    #[serde(default)]
    pub router_key: Option<String>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

// ----------------------------------------------------------------------
// Card predicates
// ----------------------------------------------------------------------

fn validate_luhn(pan: &str) -> Result<(), ValidationError> {
    if pan.len() < 12 || pan.len() > 19 || !pan.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("luhn"));
    }

    let sum: u32 = pan
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let mut digit = (b - b'0') as u32;
            if i % 2 == 1 {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            digit
        })
        .sum();

    if sum % 10 == 0 {
        Ok(())
    } else {
        Err(ValidationError::new("luhn"))
    }
}

fn validate_cvv(cvv: &str) -> Result<(), ValidationError> {
    if (cvv.len() == 3 || cvv.len() == 4) && cvv.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("cvv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_accepts_valid_pans() {
        assert!(validate_luhn("4111111111111111").is_ok());
        assert!(validate_luhn("5555555555554444").is_ok());
    }

    #[test]
    fn test_luhn_rejects_invalid_pans() {
        assert!(validate_luhn("4111111111111112").is_err());
        assert!(validate_luhn("411111").is_err());
        assert!(validate_luhn("411111111111111a").is_err());
    }

    #[test]
    fn test_cvv_shape() {
        assert!(validate_cvv("123").is_ok());
        assert!(validate_cvv("1234").is_ok());
        assert!(validate_cvv("12").is_err());
        assert!(validate_cvv("12a").is_err());
    }

    #[test]
    fn test_authorize_request_rejects_unknown_fields() {
        let body = serde_json::json!({
            "order_id": "o", "amount": 1000, "customer": "c",
            "card": {"pan": "4111111111111111", "cvv": "123",
                     "expire": "2027-12-01", "holder": "H"},
            "surprise": true,
        });
        assert!(serde_json::from_value::<CardAuthorizeRequest>(body).is_err());
    }
}
