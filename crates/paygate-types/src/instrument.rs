//! Payment instrument descriptor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor row binding a durable numeric id to an instrument plugin key
/// (e.g. "card").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i32,
    pub key: String,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrument <{}>", self.key)
    }
}
