//! Tool Catalog, Request/Command pipelines and the inbound Authentication
//! Middleware for MCPFusion. This crate stops
//! at the tool-provider boundary: given a tool name and arguments it binds,
//! dispatches and shapes a result, but carries no MCP wire-protocol framing —
//! that, along with process lifecycle and signal handling, belongs to
//! whatever composition root links against it.

pub mod auth_middleware;
pub mod bootstrap;
pub mod catalog;
pub mod circuit;
pub mod correlation;
pub mod dispatch;
pub mod knowledge;
pub mod pipeline;
pub mod store_err;

pub use catalog::{KnowledgeOp, ToolCatalog, ToolDefinition, ToolKind};
pub use dispatch::GatewayService;
