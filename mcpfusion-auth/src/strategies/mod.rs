//! The six strategy implementations the `AuthManager` registers by name.

pub mod api_key;
pub mod basic;
pub mod bearer;
pub mod oauth2_device;
pub mod oauth2_external;
pub mod session_jwt;

pub use api_key::ApiKeyStrategy;
pub use basic::BasicStrategy;
pub use bearer::BearerStrategy;
pub use oauth2_device::Oauth2DeviceStrategy;
pub use oauth2_external::Oauth2ExternalStrategy;
pub use session_jwt::SessionJwtStrategy;
