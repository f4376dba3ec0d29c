//! HTTP API: server, routing, and request/response mapping for cargo ledgers.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
