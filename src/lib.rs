//! easy-mcp: declarative Model Context Protocol server
//!
//! Register tools, resources, resource templates, prompts and roots, then serve
//! them to an MCP client over stdio.
//!
//! # Architecture
//!
//! - **Declaration**: builders turn a name, metadata and a handler into an
//!   immutable definition; parameter schemas are given explicitly or
//!   inferred from a function declaration and its doc comment
//! - **Registration**: a flat list of definitions populates three
//!   registries (tools, resources plus templates, prompts) and a roots list
//! - **Dispatch**: protocol requests are routed to the registries and the
//!   results wrapped in MCP envelopes
//!
//! Resource lookup tries exact URIs first, then templates in registration
//! order; a template match is cached as a concrete resource.
//!
//! # Modules
//!
//! - [`capability`] — Definitions, builders, URI templates, signature inference
//! - [`registry`] — Tool, resource and prompt registries
//! - [`mcp`] — MCP protocol, transport, dispatcher and server
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Configuration error types

pub mod capability;
pub mod config;
pub mod error;
pub mod mcp;
pub mod registry;
