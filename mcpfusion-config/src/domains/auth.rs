//! Authentication strategy configuration. The strategy name
//! selects which implementation in `mcpfusion-auth` handles a request;
//! strategy-specific fields live beside it in one tagged enum.

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AuthConfig {
    Bearer,
    ApiKey {
        #[serde(default = "default_api_key_header")]
        header: String,
        #[serde(default)]
        query_param: Option<String>,
    },
    Basic,
    Oauth2Device {
        client_id: String,
        #[serde(default)]
        client_secret: Option<String>,
        device_authorization_url: String,
        token_url: String,
        #[serde(default)]
        scopes: Vec<String>,
        #[serde(default = "default_refresh_buffer_seconds")]
        refresh_buffer_seconds: i64,
    },
    Oauth2External {
        token_url: String,
        client_id: String,
        #[serde(default)]
        client_secret: Option<String>,
        #[serde(default = "default_refresh_buffer_seconds")]
        refresh_buffer_seconds: i64,
    },
    SessionJwt {
        token_url: String,
        #[serde(default = "default_refresh_buffer_seconds")]
        refresh_buffer_seconds: i64,
    },
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

fn default_refresh_buffer_seconds() -> i64 {
    300
}

impl AuthConfig {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            AuthConfig::Bearer => "bearer",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Basic => "basic",
            AuthConfig::Oauth2Device { .. } => "oauth2_device",
            AuthConfig::Oauth2External { .. } => "oauth2_external",
            AuthConfig::SessionJwt { .. } => "session_jwt",
        }
    }

    pub fn supports_refresh(&self) -> bool {
        matches!(
            self,
            AuthConfig::Oauth2Device { .. } | AuthConfig::Oauth2External { .. } | AuthConfig::SessionJwt { .. }
        )
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            AuthConfig::Bearer | AuthConfig::Basic => Ok(()),
            AuthConfig::ApiKey { header, .. } => validate_required_string(header, "header", self.domain_name()),
            AuthConfig::Oauth2Device {
                client_id,
                device_authorization_url,
                token_url,
                ..
            } => {
                validate_required_string(client_id, "client_id", self.domain_name())?;
                validate_url(device_authorization_url, "device_authorization_url", self.domain_name())?;
                validate_url(token_url, "token_url", self.domain_name())
            }
            AuthConfig::Oauth2External { token_url, client_id, .. } => {
                validate_required_string(client_id, "client_id", self.domain_name())?;
                validate_url(token_url, "token_url", self.domain_name())
            }
            AuthConfig::SessionJwt { token_url, .. } => validate_url(token_url, "token_url", self.domain_name()),
        }
    }

    fn domain_name(&self) -> &'static str {
        "auth"
    }
}
