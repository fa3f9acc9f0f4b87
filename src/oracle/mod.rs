// Classification oracle: prompt contract and HTTP client

pub mod client;
pub mod prompt;

pub use client::OpenAiOracleClient;
