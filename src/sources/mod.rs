/// Sources module
///
/// Acquisition functions that produce tokens for the cache.

pub mod http;

pub use http::HttpTokenSource;
