// Shared domain types, errors and resilience primitives

pub mod errors;
pub mod models;
pub mod resilience;
