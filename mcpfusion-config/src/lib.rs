//! Config Model & Loader and the Parameter System
//! that binds invocations against it.

pub mod binding;
pub mod domains;
pub mod envfile;
pub mod error;
pub mod loader;
pub mod timetoken;
pub mod validation;

pub use domains::{
    auth::AuthConfig,
    command::CommandGroupConfig,
    logging::LoggingConfig,
    service::{
        CachingConfig, ConnectionOverrides, EndpointConfig, PaginationConfig, ParameterConfig,
        ParameterLocation, ParameterType, ServiceConfig,
    },
    McpFusionConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigHandle, ConfigLoader};
