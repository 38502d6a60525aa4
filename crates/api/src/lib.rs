//! HTTP API: server, routing, and request/response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

#[cfg(test)]
pub(crate) mod test_support;
