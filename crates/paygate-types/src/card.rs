//! Stored card instrument and card-network classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored payment card. Keyed by PAN; the CVV is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i32,
    pub pan: String,
    pub exp_date: NaiveDate,
    pub holder: String,
}

impl Card {
    pub fn network(&self) -> CardNetwork {
        CardNetwork::from_pan(&self.pan)
    }
}

/// Card network derived from the PAN prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Mir,
    Amex,
    Unknown,
}

impl CardNetwork {
    /// Classify a PAN by its issuer identification prefix.
    ///
    /// Mastercard covers both the classic 51-55 range and the newer
    /// 2221-2720 range; MIR sits in 2200-2204 and is matched first.
    pub fn from_pan(pan: &str) -> Self {
        let p2 = prefix_num(pan, 2);
        let p4 = prefix_num(pan, 4);

        if pan.starts_with('4') {
            return Self::Visa;
        }
        if let Some(p) = p4 {
            if (2200..=2204).contains(&p) {
                return Self::Mir;
            }
            if (2221..=2720).contains(&p) {
                return Self::Mastercard;
            }
        }
        if let Some(p) = p2 {
            if (51..=55).contains(&p) {
                return Self::Mastercard;
            }
            if p == 34 || p == 37 {
                return Self::Amex;
            }
        }
        Self::Unknown
    }
}

impl fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Mir => "mir",
            Self::Amex => "amex",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

fn prefix_num(pan: &str, len: usize) -> Option<u32> {
    pan.get(..len).and_then(|p| p.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_classification() {
        assert_eq!(CardNetwork::from_pan("4111111111111111"), CardNetwork::Visa);
        assert_eq!(
            CardNetwork::from_pan("5469380000000000"),
            CardNetwork::Mastercard
        );
        assert_eq!(
            CardNetwork::from_pan("2221000000000000"),
            CardNetwork::Mastercard
        );
        assert_eq!(CardNetwork::from_pan("2200000000000000"), CardNetwork::Mir);
        assert_eq!(CardNetwork::from_pan("340000000000000"), CardNetwork::Amex);
        assert_eq!(
            CardNetwork::from_pan("6011000000000000"),
            CardNetwork::Unknown
        );
    }

    #[test]
    fn test_short_pan_does_not_panic() {
        assert_eq!(CardNetwork::from_pan("5"), CardNetwork::Unknown);
        assert_eq!(CardNetwork::from_pan(""), CardNetwork::Unknown);
    }
}
