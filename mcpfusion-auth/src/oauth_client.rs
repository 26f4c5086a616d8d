//! Minimal OAuth2 token-endpoint client shared by the device/external/
//! session strategies. Talks to IdP endpoints configured per service, which
//! are unrelated to the pooled upstream transport in `mcpfusion-http`, so a
//! plain `reqwest::Client` is used directly rather than threading the
//! request pipeline's transport through the auth layer.

use mcpfusion_core::CoreError;
use serde::Deserialize;
use std::collections::HashMap;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("reqwest client configuration is always valid")
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Deserialize)]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: i64,
    #[serde(default = "default_poll_interval")]
    pub interval: i64,
}

fn default_poll_interval() -> i64 {
    5
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
}

/// `POST` a form-encoded body to a token or device-authorization endpoint and
/// decode the JSON response, categorizing failures the way the request
/// pipeline would: network/5xx are transient, 4xx are permanent.
pub async fn post_form<T: for<'de> Deserialize<'de>>(
    url: &str,
    form: &HashMap<&str, &str>,
) -> Result<T, CoreError> {
    let response = client()
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|err| {
            if err.is_timeout() || err.is_connect() {
                CoreError::UpstreamTransient(err.to_string())
            } else {
                CoreError::UpstreamPermanent(err.to_string())
            }
        })?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CoreError::UpstreamTransient(err.to_string()))?;

    if status.is_success() {
        serde_json::from_slice(&bytes)
            .map_err(|err| CoreError::AuthRefreshFailed(format!("malformed token response: {err}")))
    } else if status.is_server_error() {
        Err(CoreError::UpstreamTransient(format!("token endpoint returned {status}")))
    } else {
        let reason = serde_json::from_slice::<TokenErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        Err(CoreError::AuthRefreshFailed(reason))
    }
}

/// Is this an RFC 8628 `authorization_pending`/`slow_down` response, i.e.
/// should the device-flow poll loop keep going?
pub fn is_pending_error(err: &CoreError) -> Option<bool> {
    match err {
        CoreError::AuthRefreshFailed(reason) => {
            if reason.contains("authorization_pending") {
                Some(false)
            } else if reason.contains("slow_down") {
                Some(true)
            } else {
                None
            }
        }
        _ => None,
    }
}
