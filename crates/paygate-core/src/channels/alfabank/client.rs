//! AlfaBank wire client
//!
//! Form-encoded POSTs with the account credentials injected into every
//! request. PAN, CVC and password values are masked before any request
//! is logged.

use serde_json::Value;

use crate::channel::ChannelError;

pub struct AlfaBankClient {
    http: reqwest::Client,
    base_url: String,
    login: String,
    password: String,
}

impl AlfaBankClient {
    pub fn new(http: reqwest::Client, base_url: String, login: String, password: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            login,
            password,
        }
    }

    /// POST a form to an API path and parse the JSON body.
    pub async fn post(&self, path: &str, params: &[(String, String)]) -> Result<Value, ChannelError> {
        let url = format!("{}/{}", self.base_url, path);

        let mut form: Vec<(String, String)> = Vec::with_capacity(params.len() + 2);
        form.push(("userName".into(), self.login.clone()));
        form.push(("password".into(), self.password.clone()));
        form.extend_from_slice(params);

        tracing::debug!(url = %url, params = ?mask_params(&form), "acquirer request");

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ChannelError::Processing(format!("acquirer request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChannelError::Processing(format!("acquirer response read failed: {e}")))?;

        tracing::debug!(url = %url, status = status.as_u16(), body = %body, "acquirer response");

        serde_json::from_str(&body)
            .map_err(|e| ChannelError::Processing(format!("acquirer response parse failed: {e}")))
    }

    /// POST a form to an absolute URL, following redirects, and return
    /// the final response body as text. Used by the 3DS v2 browser
    /// fingerprint exchange, whose endpoints are not JSON APIs.
    pub async fn post_text(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, ChannelError> {
        tracing::debug!(url = %url, params = ?mask_params(params), "fingerprint request");

        let response = self
            .http
            .post(url)
            .form(&params.to_vec())
            .send()
            .await
            .map_err(|e| ChannelError::Processing(format!("fingerprint request failed: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| ChannelError::Processing(format!("fingerprint response read failed: {e}")))
    }
}

/// Keys whose values must never appear in logs.
fn is_sensitive(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    lowered.contains("pan") || lowered.contains("cvc") || lowered.contains("password")
}

/// Mask sensitive values: PANs keep the first six and last four digits,
/// everything else sensitive is fully replaced.
pub(crate) fn mask_params(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            let value = if is_sensitive(k) {
                if k.to_ascii_lowercase().contains("pan") {
                    mask_pan(v)
                } else {
                    "***".to_string()
                }
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}

pub(crate) fn mask_pan(pan: &str) -> String {
    if pan.len() <= 10 {
        return "*".repeat(pan.len());
    }
    let head = &pan[..6];
    let tail = &pan[pan.len() - 4..];
    format!("{head}{}{tail}", "*".repeat(pan.len() - 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_pan() {
        assert_eq!(mask_pan("4111111111111111"), "411111******1111");
        assert_eq!(mask_pan("41111"), "*****");
    }

    #[test]
    fn test_mask_params_hides_sensitive_values() {
        let params = vec![
            ("userName".to_string(), "merchant".to_string()),
            ("password".to_string(), "secret".to_string()),
            ("$PAN".to_string(), "4111111111111111".to_string()),
            ("$CVC".to_string(), "123".to_string()),
            ("amount".to_string(), "1000".to_string()),
        ];
        let masked = mask_params(&params);
        let rendered = format!("{masked:?}");

        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("123\""));
        assert!(rendered.contains("411111******1111"));
        assert!(rendered.contains("merchant"));
        assert!(rendered.contains("1000"));
    }
}
