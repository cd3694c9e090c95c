//! Routing entities

use crate::{Account, Instrument, Profile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor row binding a durable numeric id to a router plugin key
/// (e.g. "visamaster").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    pub id: i32,
    pub key: String,
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "router <{}>", self.key)
    }
}

/// A route maps (profile, instrument) to an account, either directly or
/// through a router plugin that picks the account per transaction.
///
/// Exactly one of `account`/`router` is set at creation; after router
/// execution a resolved route always carries an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i32,
    pub profile: Profile,
    pub instrument: Instrument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<Router>,
    /// Opaque blob decoded by the router plugin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

impl Route {
    /// True when the route needs a router plugin run to yield an account.
    pub fn is_routed(&self) -> bool {
        self.router.is_some()
    }
}
