// Library root for the SQL-injection guardrail

pub mod api;
pub mod config;
pub mod core;
pub mod engine;
pub mod metrics;
pub mod oracle;
pub mod state;
