pub mod cache;
pub mod cached;
pub mod client;
pub mod types;
