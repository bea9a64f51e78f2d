pub mod client;
pub(crate) mod models;
pub mod processing;

pub use client::{DiscogsClient, DiscogsClientBuilder, DEFAULT_API_URL};
pub use processing::strip_disambiguation;
