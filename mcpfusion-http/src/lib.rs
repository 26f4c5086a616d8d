//! Pooled HTTP transport for the Request Pipeline's upstream calls.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

pub use client::{connection_overrides, run_idle_sweeper, HttpTransport};
pub use config::HttpTransportConfig;
pub use errors::HttpError;
pub use types::HttpResponse;