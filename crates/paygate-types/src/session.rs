//! Interactive-flow session blobs
//!
//! Short-lived keyed maps parking acquirer context between the inbound
//! request that started a 3-D Secure flow and the callback that resumes it.

use serde::{Deserialize, Serialize};

/// Key prefix tying a 3DS v2 session to its transaction.
pub const THREEDS20_SESSION_PREFIX: &str = "3ds20session_";

/// Build the session key owned by transaction `tid`.
pub fn threeds20_session_key(tid: i64) -> String {
    format!("{THREEDS20_SESSION_PREFIX}{tid}")
}

/// A keyed opaque map. Writers own key uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.data.insert(field.into(), value.into());
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_embeds_transaction_id() {
        assert_eq!(threeds20_session_key(42), "3ds20session_42");
    }

    #[test]
    fn test_get_str() {
        let mut s = Session::new("3ds20session_1");
        s.insert("tdsTransId", "abc");
        assert_eq!(s.get_str("tdsTransId"), Some("abc"));
        assert_eq!(s.get_str("missing"), None);
    }
}
