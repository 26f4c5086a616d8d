//! Auth-code handoff ("Auth-code handoff"): lets an external OAuth
//! helper (run out-of-band, e.g. by an operator's browser flow) hand a freshly
//! obtained token back to the gateway without ever seeing the tenant's API
//! token. The gateway mints a short-lived, single-use code embedding the
//! tenant/service pair; the helper redeems it once it has a token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mcpfusion_core::domain::OAuthTokenData;
use mcpfusion_core::CoreError;
use mcpfusion_interfaces::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const AUTH_CODE_TTL_SECONDS: i64 = 900;

#[derive(Debug, Serialize, Deserialize)]
struct AuthCodeHandoff {
    server_url: String,
    service: String,
    code: String,
}

/// Mints a one-time code for `(tenant, service)` and returns an opaque,
/// URL-safe blob a human can paste into the external helper: it carries the
/// server URL and service name alongside the raw code so the helper knows
/// where to redeem it without extra configuration.
pub async fn create_auth_code(
    store: &Arc<dyn Store>,
    tenant: &str,
    service: &str,
    server_url: &str,
) -> Result<String, CoreError> {
    let code = store
        .create_auth_code(tenant, service, AUTH_CODE_TTL_SECONDS)
        .await
        .map_err(crate::store_err::to_core_error)?;

    let handoff = AuthCodeHandoff {
        server_url: server_url.to_string(),
        service: service.to_string(),
        code,
    };
    let json = serde_json::to_vec(&handoff).map_err(|err| CoreError::Other(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a blob minted by [`create_auth_code`] without redeeming it, so a
/// helper can discover `server_url`/`service` before making any requests.
pub fn decode_auth_code_blob(blob: &str) -> Result<(String, String, String), CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(blob)
        .map_err(|err| CoreError::Validation(format!("malformed auth code: {err}")))?;
    let handoff: AuthCodeHandoff =
        serde_json::from_slice(&bytes).map_err(|err| CoreError::Validation(format!("malformed auth code: {err}")))?;
    Ok((handoff.server_url, handoff.service, handoff.code))
}

/// Redeems a raw code (the `code` field inside a decoded blob, not the blob
/// itself) and stores the token the helper obtained. Single-use: a second
/// redemption attempt fails because the store deletes the code on success.
pub async fn complete_auth_code(
    store: &Arc<dyn Store>,
    code: &str,
    token: OAuthTokenData,
) -> Result<(), CoreError> {
    let data = store
        .validate_auth_code(code)
        .await
        .map_err(crate::store_err::to_core_error)?;
    store
        .store_oauth_token(&data.tenant_hash, &data.service, token)
        .await
        .map_err(crate::store_err::to_core_error)
}
