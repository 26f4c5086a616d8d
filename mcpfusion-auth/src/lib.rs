//! Authentication strategy registry for MCPFusion's outgoing service calls
//!: injects per-tenant credentials into outbound requests and
//! refreshes them under a single-flight guard when they go stale.

pub mod auth_code;
pub mod oauth_client;
pub mod refresh;
pub mod registry;
pub mod store_err;
pub mod strategies;
pub mod strategy;

pub use auth_code::{complete_auth_code, create_auth_code, decode_auth_code_blob};
pub use refresh::RefreshCoordinator;
pub use registry::AuthManager;
pub use strategies::{
    ApiKeyStrategy, BasicStrategy, BearerStrategy, Oauth2DeviceStrategy, Oauth2ExternalStrategy,
    SessionJwtStrategy,
};
pub use strategy::{AuthStrategy, RequestAuth};
