//! 3-D Secure payloads attached to transactions

use serde::{Deserialize, Serialize};

/// Browser environment supplied by the merchant page, forwarded to the
/// issuer during 3DS v2 device fingerprinting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserInfo {
    pub user_agent: String,
    pub accept_header: String,
    pub color_depth: i32,
    pub ip: String,
    pub language: String,
    pub screen_height: i32,
    pub screen_width: i32,
    pub screen_print: String,
    pub tz: i32,
    pub time_zone: String,
    pub java_enabled: bool,
    pub device_channel: String,
}

/// 3DS v1 challenge handoff: the client must POST `pareq` to `acs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsSecure10 {
    pub acs: String,
    pub pareq: String,
}

/// 3DS v2 challenge handoff: the client must POST `creq` to `acs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsSecure20 {
    pub acs: String,
    pub creq: String,
}

/// 3DS v2 method-URL probe: the client loads `method_url` in a hidden
/// frame with `method_data`, then reports completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsMethodUrl {
    pub method_url: String,
    pub method_data: String,
}
