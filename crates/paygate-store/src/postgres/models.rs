//! Row structs and enum column codecs

use paygate_types::{TransactionStatus, TransactionType};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, FromRow)]
pub(crate) struct CurrencyRow {
    pub id: i32,
    pub numeric_code: i32,
    pub char_code: String,
    pub name: String,
    pub exponent: i32,
}

#[derive(Debug, FromRow)]
pub(crate) struct ProfileRow {
    pub id: i32,
    pub key: String,
    pub description: String,
    pub currency_id: i32,
}

#[derive(Debug, FromRow)]
pub(crate) struct ChannelRow {
    pub id: i32,
    pub type_id: i32,
    pub key: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub id: i32,
    pub is_enabled: bool,
    pub is_test: bool,
    pub rebill_enabled: bool,
    pub refund_enabled: bool,
    pub reversal_enabled: bool,
    pub partial_confirm_enabled: bool,
    pub partial_reversal_enabled: bool,
    pub partial_refund_enabled: bool,
    pub currency_conversion_enabled: bool,
    pub currency_id: i32,
    pub channel_id: i32,
    pub settings: serde_json::Value,
}

#[derive(Debug, FromRow)]
pub(crate) struct InstrumentRow {
    pub id: i32,
    pub key: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct RouterRow {
    pub id: i32,
    pub key: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct RouteRow {
    pub id: i32,
    pub profile_id: i32,
    pub instrument_id: i32,
    pub account_id: Option<i32>,
    pub router_id: Option<i32>,
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, FromRow)]
pub(crate) struct CardRow {
    pub id: i32,
    pub pan: String,
    pub exp_date: chrono::NaiveDate,
    pub holder: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct TransactionRow {
    pub id: i64,
    pub tx_type: String,
    pub status: String,
    pub profile_id: i32,
    pub account_id: i32,
    pub instrument_id: i32,
    pub instrument_ref: i32,
    pub currency_id: i32,
    pub amount: i64,
    pub amount_converted: i64,
    pub currency_converted_id: i32,
    pub order_id: String,
    pub customer: String,
    pub reference_id: Option<i64>,
    pub remote_id: Option<String>,
    pub response_code: Option<String>,
    pub decline_reason: Option<String>,
    pub auth_code: Option<String>,
    pub rrn: Option<String>,
    pub additional_data: Option<serde_json::Value>,
    pub browser_info: Option<serde_json::Value>,
    pub three_ds_method_url: Option<serde_json::Value>,
    pub three_ds_secure_10: Option<serde_json::Value>,
    pub three_ds_secure_20: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct SessionRow {
    pub key: String,
    pub data: serde_json::Value,
}

pub(crate) fn tx_type_to_column(t: TransactionType) -> &'static str {
    match t {
        TransactionType::Auth => "auth",
        TransactionType::Preauth => "preauth",
        TransactionType::Confirmauth => "confirmauth",
        TransactionType::Reversal => "reversal",
        TransactionType::Refund => "refund",
        TransactionType::Rebill => "rebill",
    }
}

pub(crate) fn tx_type_from_column(s: &str) -> StoreResult<TransactionType> {
    Ok(match s {
        "auth" => TransactionType::Auth,
        "preauth" => TransactionType::Preauth,
        "confirmauth" => TransactionType::Confirmauth,
        "reversal" => TransactionType::Reversal,
        "refund" => TransactionType::Refund,
        "rebill" => TransactionType::Rebill,
        other => {
            return Err(StoreError::InvalidInput(format!(
                "unknown transaction type column value: {other}"
            )))
        }
    })
}

pub(crate) fn tx_status_to_column(s: &TransactionStatus) -> &'static str {
    match s {
        TransactionStatus::New => "new",
        TransactionStatus::Success => "success",
        TransactionStatus::Declined => "declined",
        TransactionStatus::WaitMethodUrl => "wait_method_url",
        TransactionStatus::Wait3ds => "wait_3ds",
        TransactionStatus::WaitAreq => "wait_areq",
    }
}

pub(crate) fn tx_status_from_column(s: &str) -> StoreResult<TransactionStatus> {
    Ok(match s {
        "new" => TransactionStatus::New,
        "success" => TransactionStatus::Success,
        "declined" => TransactionStatus::Declined,
        "wait_method_url" => TransactionStatus::WaitMethodUrl,
        "wait_3ds" => TransactionStatus::Wait3ds,
        "wait_areq" => TransactionStatus::WaitAreq,
        other => {
            return Err(StoreError::InvalidInput(format!(
                "unknown transaction status column value: {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_column_roundtrip() {
        for t in [
            TransactionType::Auth,
            TransactionType::Preauth,
            TransactionType::Confirmauth,
            TransactionType::Reversal,
            TransactionType::Refund,
            TransactionType::Rebill,
        ] {
            assert_eq!(tx_type_from_column(tx_type_to_column(t)).unwrap(), t);
        }
    }

    #[test]
    fn test_status_column_rejects_unknown() {
        assert!(tx_status_from_column("settled").is_err());
    }
}
