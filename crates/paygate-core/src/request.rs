//! Typed payment requests handed to the orchestrator
//!
//! The HTTP layer validates and converts its DTOs into these structs, so
//! channel adapters never see raw JSON.

use chrono::NaiveDate;
use paygate_types::BrowserInfo;

/// Card fields for a root operation. The CVV lives only in this
/// request; it is never persisted.
#[derive(Debug, Clone)]
pub struct CardData {
    pub pan: String,
    pub cvv: String,
    pub expire: NaiveDate,
    pub holder: String,
}

/// A validated authorize/preauthorize request.
#[derive(Debug, Clone)]
pub struct CardPaymentRequest {
    pub order_id: String,
    pub amount: i64,
    pub customer: String,
    pub card: CardData,
    /// Merchant URL the acquirer redirects to after a 3DS v1 challenge
    pub return_url: Option<String>,
    /// Merchant URL the ACS posts the CRes to in 3DS v2
    pub threedsver2_term_url: Option<String>,
    pub browser_info: Option<BrowserInfo>,
}
