//! AlfaBank wire message views
//!
//! The acquirer delivers numbers as float, int or string interchangeably,
//! so every extraction goes through the lenient helpers below instead of
//! rigid serde structs.

use serde_json::Value;

/// Read a field as a string, accepting string and number encodings.
pub(crate) fn opt_string(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a field as an integer, accepting int, float and string encodings.
pub(crate) fn opt_i64(v: &Value, key: &str) -> Option<i64> {
    match v.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a field as a bool, accepting bool, "true"/"false" and 0/1.
pub(crate) fn opt_bool(v: &Value, key: &str) -> Option<bool> {
    match v.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

/// Error pair present on most responses when the call failed.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorFields {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorFields {
    pub(crate) fn parse(v: &Value) -> Self {
        Self {
            code: opt_string(v, "errorCode"),
            message: opt_string(v, "errorMessage"),
        }
    }

    /// AlfaBank reports success as errorCode 0 or an absent errorCode.
    pub(crate) fn is_error(&self) -> bool {
        matches!(self.code.as_deref(), Some(code) if code != "0")
    }

    pub(crate) fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RegisterResponse {
    pub order_id: Option<String>,
    pub error: ErrorFields,
}

impl RegisterResponse {
    pub(crate) fn parse(v: &Value) -> Self {
        Self {
            order_id: opt_string(v, "orderId"),
            error: ErrorFields::parse(v),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PaymentOrderResponse {
    pub is_3ds_ver2: bool,
    pub tds_server_trans_id: Option<String>,
    pub method_url: Option<String>,
    pub method_url_server: Option<String>,
    pub method_data_packed: Option<String>,
    pub acs_url: Option<String>,
    pub pa_req: Option<String>,
    pub packed_creq: Option<String>,
    pub error: ErrorFields,
}

impl PaymentOrderResponse {
    pub(crate) fn parse(v: &Value) -> Self {
        Self {
            is_3ds_ver2: opt_bool(v, "is3DSVer2").unwrap_or(false),
            tds_server_trans_id: opt_string(v, "threeDSServerTransId"),
            method_url: opt_string(v, "threeDSMethodURL"),
            method_url_server: opt_string(v, "threeDSMethodURLServer"),
            method_data_packed: opt_string(v, "threeDSMethodDataPacked"),
            acs_url: opt_string(v, "acsUrl"),
            pa_req: opt_string(v, "paReq"),
            packed_creq: opt_string(v, "packedCReq"),
            error: ErrorFields::parse(v),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrderStatusResponse {
    pub order_status: Option<i64>,
    pub action_code: Option<String>,
    pub action_code_description: Option<String>,
    pub auth_ref_num: Option<String>,
    pub approval_code: Option<String>,
    pub binding_id: Option<String>,
}

impl OrderStatusResponse {
    pub(crate) fn parse(v: &Value) -> Self {
        Self {
            order_status: opt_i64(v, "orderStatus"),
            action_code: opt_string(v, "actionCode"),
            action_code_description: opt_string(v, "actionCodeDescription"),
            auth_ref_num: opt_string(v, "authRefNum"),
            approval_code: v
                .get("cardAuthInfo")
                .and_then(|info| opt_string(info, "approvalCode")),
            binding_id: v
                .get("bindingInfo")
                .and_then(|info| opt_string(info, "bindingId")),
        }
    }
}

/// Extract the last `http(s)://…` URL from a response body. The 3DS
/// method-URL server answers with markup whose final link is the
/// client-info collection endpoint.
pub(crate) fn find_last_url(body: &str) -> Option<String> {
    let start = match (body.rfind("https://"), body.rfind("http://")) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let tail = &body[start..];
    let end = tail
        .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | ')'))
        .unwrap_or(tail.len());
    Some(tail[..end].to_string())
}

/// Rough OS classification from the user agent for the ClientInfo block.
pub(crate) fn platform_from_ua(ua: &str) -> &'static str {
    if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
        "iOS"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Mac OS") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    }
}

pub(crate) fn device_from_ua(ua: &str) -> &'static str {
    if ua.contains("Mobile") || ua.contains("Android") || ua.contains("iPhone") {
        "mobile"
    } else {
        "desktop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_fields_accept_all_encodings() {
        let as_int = json!({"orderStatus": 2});
        let as_float = json!({"orderStatus": 2.0});
        let as_string = json!({"orderStatus": "2"});

        assert_eq!(opt_i64(&as_int, "orderStatus"), Some(2));
        assert_eq!(opt_i64(&as_float, "orderStatus"), Some(2));
        assert_eq!(opt_i64(&as_string, "orderStatus"), Some(2));
    }

    #[test]
    fn test_action_code_tolerates_number_and_string() {
        let v = json!({"actionCode": 0});
        assert_eq!(opt_string(&v, "actionCode").as_deref(), Some("0"));
        let v = json!({"actionCode": "0"});
        assert_eq!(opt_string(&v, "actionCode").as_deref(), Some("0"));
    }

    #[test]
    fn test_is3dsver2_tolerates_string() {
        let v = json!({"is3DSVer2": "true"});
        assert_eq!(opt_bool(&v, "is3DSVer2"), Some(true));
        let v = json!({"is3DSVer2": true});
        assert_eq!(opt_bool(&v, "is3DSVer2"), Some(true));
    }

    #[test]
    fn test_order_status_nested_fields() {
        let v = json!({
            "orderStatus": "2",
            "actionCode": 0,
            "authRefNum": 111222,
            "cardAuthInfo": {"approvalCode": "ABC123"},
            "bindingInfo": {"bindingId": "bind-1"}
        });
        let st = OrderStatusResponse::parse(&v);
        assert_eq!(st.order_status, Some(2));
        assert_eq!(st.action_code.as_deref(), Some("0"));
        assert_eq!(st.auth_ref_num.as_deref(), Some("111222"));
        assert_eq!(st.approval_code.as_deref(), Some("ABC123"));
        assert_eq!(st.binding_id.as_deref(), Some("bind-1"));
    }

    #[test]
    fn test_error_fields() {
        let ok = json!({"errorCode": "0"});
        assert!(!ErrorFields::parse(&ok).is_error());
        let ok = json!({"orderId": "x"});
        assert!(!ErrorFields::parse(&ok).is_error());
        let bad = json!({"errorCode": 5, "errorMessage": "access denied"});
        let err = ErrorFields::parse(&bad);
        assert!(err.is_error());
        assert_eq!(err.message_or("fallback"), "access denied");
    }

    #[test]
    fn test_find_last_url() {
        let body = r#"<html><iframe src="https://acs.example/frame">
            submit to https://collector.example/clientinfo"#;
        assert_eq!(
            find_last_url(body).as_deref(),
            Some("https://collector.example/clientinfo")
        );
        assert_eq!(find_last_url("no links here"), None);
    }

    #[test]
    fn test_ua_classification() {
        let win = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
        assert_eq!(platform_from_ua(win), "Windows");
        assert_eq!(device_from_ua(win), "desktop");

        let android = "Mozilla/5.0 (Linux; Android 13; Pixel 7) Mobile";
        assert_eq!(platform_from_ua(android), "Android");
        assert_eq!(device_from_ua(android), "mobile");
    }
}
