//! Single-flight token cache.
//!
//! [`TokenCache`] maps a [`CacheKey`] to a [`Slot`]; each slot runs at most
//! one acquisition at a time and shares its result with every caller that
//! asked while it was running.

pub mod error;
pub mod key;
pub mod slot;
pub mod token;
pub mod token_cache;

pub use error::AcquireError;
pub use key::{CacheKey, TokenRequest};
pub use slot::{acquire_fn, AcquireFn, Outcome, Slot, SlotStatus};
pub use token::Token;
pub use token_cache::{default_cache, init_default_cache, SharedError, TokenCache};
