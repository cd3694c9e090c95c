//! Acquirer account entity

use crate::{Channel, Currency};
use serde::{Deserialize, Serialize};

/// An acquirer credential bound to a channel and currency.
///
/// `settings` is an opaque blob decoded by the owning channel adapter
/// (e.g. login/password for the AlfaBank wire protocol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
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
    pub currency: Currency,
    pub channel: Channel,
    pub settings: serde_json::Value,
}
