// Shared state: toggle persistence and verdict caching

pub mod toggle_store;
pub mod verdict_cache;
