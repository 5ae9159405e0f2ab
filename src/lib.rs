// Library root — exposes internals for integration tests.
// The binary entry point is src/main.rs.

pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod http;
pub mod llm;
pub mod logger;
pub mod metrics;
