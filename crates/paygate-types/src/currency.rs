//! Currency reference entity (ISO 4217 shaped)

use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency row referenced by profiles and accounts.
///
/// Immutable after creation except via administrative patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: i32,
    /// ISO 4217 numeric code (e.g. 840 for USD)
    pub numeric_code: i32,
    /// ISO 4217 character code (e.g. "USD")
    pub char_code: String,
    pub name: String,
    /// Number of minor-unit digits
    pub exponent: i32,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.char_code, self.numeric_code)
    }
}
