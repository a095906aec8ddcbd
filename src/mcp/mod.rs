//! Model Context Protocol (MCP) server plumbing.
//!
//! Exposes the registered capabilities to a client over newline-delimited
//! JSON-RPC 2.0 on stdio.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│  Dispatcher  │    │
//! │   │   (stdio)   │    │ (lifecycle) │    │ (registries) │    │
//! │   └─────────────┘    └─────────────┘    └──────────────┘    │
//! │          ▲                  ▲                  │             │
//! │          │                  │                  ▼             │
//! │          │           ┌─────────────┐    ┌──────────────┐    │
//! │          └───────────│ notification│◀───│   Context    │    │
//! │                      │    queue    │    │  (handlers)  │    │
//! │                      └─────────────┘    └──────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod context;
pub mod dispatcher;
pub mod protocol;
pub mod server;
pub mod transport;

pub use context::{Context, Notifier};
pub use dispatcher::{DispatchError, Dispatcher, RequestKind};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, LoggingLevel, ProgressToken, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerInfo};
pub use transport::{Line, StdioTransport, Transport};
