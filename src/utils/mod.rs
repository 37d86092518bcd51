pub mod geo;
pub mod token;
pub mod ttl_cache;
