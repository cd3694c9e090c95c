//! Channel adapter descriptor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type id for bank channels. Reserved room for future non-bank channel
/// families (payout, wallet top-up).
pub const BANK_CHANNEL_TYPE: i32 = 1;

/// Descriptor row binding a durable numeric id to a channel plugin key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i32,
    pub type_id: i32,
    /// Unique plugin key (e.g. "alfabank")
    pub key: String,
}

impl Channel {
    pub fn is_bank(&self) -> bool {
        self.type_id == BANK_CHANNEL_TYPE
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel <{}>", self.key)
    }
}
