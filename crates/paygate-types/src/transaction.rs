//! Transaction entity and state machine
//!
//! Transactions are created in `New` before the acquirer is contacted,
//! move to a terminal or waiting state when the adapter returns, and are
//! advanced by callbacks while waiting. They are never deleted.

use crate::{Account, BrowserInfo, Currency, Instrument, Profile, ThreeDsMethodUrl,
    ThreeDsSecure10, ThreeDsSecure20};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation kind of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// One-step capture
    Auth,
    /// Reservation only
    Preauth,
    /// Capture of a prior reservation
    Confirmauth,
    Reversal,
    Refund,
    Rebill,
}

impl TransactionType {
    /// Root operations start a payment; the rest reference one.
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Auth | Self::Preauth)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Preauth => "preauth",
            Self::Confirmauth => "confirmauth",
            Self::Reversal => "reversal",
            Self::Refund => "refund",
            Self::Rebill => "rebill",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle status.
///
/// `New → {Success, Declined, WaitMethodUrl, Wait3ds, WaitAreq}`; waiting
/// states advance via callbacks; `Success`/`Declined` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    New,
    Success,
    Declined,
    WaitMethodUrl,
    Wait3ds,
    WaitAreq,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Declined)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Success => "success",
            Self::Declined => "declined",
            Self::WaitMethodUrl => "wait_method_url",
            Self::Wait3ds => "wait_3ds",
            Self::WaitAreq => "wait_areq",
        };
        write!(f, "{name}")
    }
}

/// The central entity: one acquirer-facing operation with its outcome.
///
/// Optional fields are filled progressively as the protocol advances and
/// omitted from JSON while absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub profile: Profile,
    pub account: Account,
    pub instrument: Instrument,
    /// Id of the stored instrument row (e.g. the card)
    pub instrument_id: i32,
    pub currency: Currency,
    pub amount: i64,
    pub amount_converted: i64,
    pub currency_converted: Currency,
    pub order_id: String,
    pub customer: String,
    /// The original auth/preauth for confirm/reverse/refund/rebill
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Box<Transaction>>,
    /// Acquirer-side order id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Acquirer action/error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    /// Decline reason as reported by the acquirer or adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Retrieval reference number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrn: Option<String>,
    /// Adapter-private extras (e.g. acquirer binding id for rebill)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_info: Option<BrowserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_ds_method_url: Option<ThreeDsMethodUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_ds_secure_10: Option<ThreeDsSecure10>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_ds_secure_20: Option<ThreeDsSecure20>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a transaction in `New`. The id is assigned by the store.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_type: TransactionType,
        profile: Profile,
        account: Account,
        instrument: Instrument,
        instrument_id: i32,
        currency: Currency,
        amount: i64,
        order_id: String,
        customer: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tx_type,
            status: TransactionStatus::New,
            profile,
            account,
            instrument,
            instrument_id,
            currency_converted: currency.clone(),
            currency,
            amount,
            amount_converted: amount,
            order_id,
            customer,
            reference: None,
            remote_id: None,
            response_code: None,
            decline_reason: None,
            auth_code: None,
            rrn: None,
            additional_data: None,
            browser_info: None,
            three_ds_method_url: None,
            three_ds_secure_10: None,
            three_ds_secure_20: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    pub fn is_declined(&self) -> bool {
        self.status == TransactionStatus::Declined
    }

    pub fn in_final_state(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_3ds_waiting(&self) -> bool {
        self.status == TransactionStatus::Wait3ds
    }

    pub fn is_method_url_waiting(&self) -> bool {
        self.status == TransactionStatus::WaitMethodUrl
    }

    pub fn is_areq_waiting(&self) -> bool {
        self.status == TransactionStatus::WaitAreq
    }

    pub fn is_auth(&self) -> bool {
        self.tx_type == TransactionType::Auth
    }

    pub fn is_preauth(&self) -> bool {
        self.tx_type == TransactionType::Preauth
    }

    // ------------------------------------------------------------------
    // Transitions
    //
    // All transitions latch on the terminal states: once a transaction is
    // Success or Declined a concurrent callback must not move it again.
    // ------------------------------------------------------------------

    pub fn success(&mut self) {
        self.transition(TransactionStatus::Success);
    }

    pub fn declined(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.transition(TransactionStatus::Declined) {
            self.decline_reason = Some(reason);
        }
    }

    pub fn wait_3ds(&mut self) {
        self.transition(TransactionStatus::Wait3ds);
    }

    pub fn wait_method_url(&mut self) {
        self.transition(TransactionStatus::WaitMethodUrl);
    }

    pub fn wait_areq(&mut self) {
        self.transition(TransactionStatus::WaitAreq);
    }

    fn transition(&mut self, next: TransactionStatus) -> bool {
        if self.in_final_state() {
            tracing::warn!(
                tx = self.id,
                status = %self.status,
                refused = %next,
                "transaction already in final state"
            );
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, BANK_CHANNEL_TYPE};

    fn rub() -> Currency {
        Currency {
            id: 1,
            numeric_code: 643,
            char_code: "RUB".into(),
            name: "Russian rouble".into(),
            exponent: 2,
        }
    }

    fn sample_tx() -> Transaction {
        let currency = rub();
        Transaction::new(
            TransactionType::Auth,
            Profile {
                id: 7,
                key: "shop".into(),
                description: "test shop".into(),
                currency: currency.clone(),
            },
            Account {
                id: 1,
                is_enabled: true,
                is_test: true,
                rebill_enabled: false,
                refund_enabled: true,
                reversal_enabled: true,
                partial_confirm_enabled: false,
                partial_reversal_enabled: false,
                partial_refund_enabled: false,
                currency_conversion_enabled: false,
                currency: currency.clone(),
                channel: Channel {
                    id: 2,
                    type_id: BANK_CHANNEL_TYPE,
                    key: "alfabank".into(),
                },
                settings: serde_json::json!({}),
            },
            Instrument {
                id: 1,
                key: "card".into(),
            },
            1,
            currency,
            1000,
            "order-1".into(),
            "customer-1".into(),
        )
    }

    #[test]
    fn test_created_new() {
        let tx = sample_tx();
        assert_eq!(tx.status, TransactionStatus::New);
        assert_eq!(tx.amount_converted, tx.amount);
        assert_eq!(tx.currency_converted, tx.currency);
    }

    #[test]
    fn test_terminal_latch() {
        let mut tx = sample_tx();
        tx.success();
        assert!(tx.is_success());

        tx.declined("too late");
        assert!(tx.is_success());
        assert_eq!(tx.decline_reason, None);

        tx.wait_3ds();
        assert!(tx.is_success());
    }

    #[test]
    fn test_declined_records_reason() {
        let mut tx = sample_tx();
        tx.declined("insufficient funds");
        assert!(tx.is_declined());
        assert_eq!(tx.decline_reason.as_deref(), Some("insufficient funds"));
    }

    #[test]
    fn test_waiting_states_advance() {
        let mut tx = sample_tx();
        tx.wait_method_url();
        assert!(tx.is_method_url_waiting());
        tx.wait_3ds();
        assert!(tx.is_3ds_waiting());
        tx.success();
        assert!(tx.in_final_state());
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let tx = sample_tx();
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("remote_id").is_none());
        assert!(json.get("three_ds_secure_10").is_none());
        assert_eq!(json["status"], "new");
        assert_eq!(json["type"], "auth");
    }
}
