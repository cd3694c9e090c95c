//! Merchant profile entity

use crate::Currency;
use serde::{Deserialize, Serialize};

/// Merchant configuration. Owns routes; every transaction is created on
/// behalf of exactly one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i32,
    /// Unique merchant key
    pub key: String,
    pub description: String,
    pub currency: Currency,
}
