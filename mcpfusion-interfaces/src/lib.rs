//! Core interfaces shared across the MCPFusion workspace.
//!
//! Breaking these traits out of their implementing crates keeps
//! `mcpfusion-server` able to depend on a `Store`/`Authorizer` seam instead of
//! a concrete database or policy engine.

pub mod authorizer;
pub mod store;

pub use authorizer::{AllowAllAuthorizer, Authorizer, ToolRequest};
pub use store::{ApiTokenListing, Payload, Store, StoreError, StoreResult};
