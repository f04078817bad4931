//! # Token Cache Library
//!
//! Coordinates requests for expiring authentication tokens so that
//! concurrent callers share one upstream acquisition per key and never
//! observe an expired token.
//!
//! Modules:
//! - `cache` — cache keys, single-flight slots and the keyed token cache
//! - `config` — YAML configuration, defaults and validation
//! - `sources` — HTTP token endpoint used as the acquisition function
//! - `resilience` — retry with exponential backoff for sources
//! - `observability` — prometheus metrics
//! - `helpers`, `utils` — time helpers and logging setup

pub mod cache;
pub mod config;
pub mod helpers;
pub mod observability;
pub mod resilience;
pub mod sources;
pub mod utils;
#[cfg(test)]
mod tests;

pub use crate::cache::{default_cache, AcquireError, CacheKey, Token, TokenCache, TokenRequest};
pub use crate::config::sources::ServiceConfig;
