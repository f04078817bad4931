use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use crate::cache::key::{CacheKey, TokenRequest};
use crate::cache::slot::{acquire_fn, Outcome, Slot, SlotStatus};
use crate::cache::token::Token;
use crate::observability::metrics::get_metrics;

/// Error type of the default cache: shared so one failure reaches every waiter.
pub type SharedError = Arc<anyhow::Error>;

/// Keyed single-flight token cache: cache key -> slot.
///
/// Slots are created on first request for a key and live until [`TokenCache::clear`].
/// Clones share the same slots.
#[derive(Clone)]
pub struct TokenCache<T, E> {
    inner: Arc<RwLock<HashMap<CacheKey, Arc<Slot<T, E>>>>>,
    default_validity: Option<Duration>,
}

impl<T, E> Default for TokenCache<T, E> {
    fn default() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), default_validity: None }
    }
}

impl<T, E> TokenCache<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose tokens stay valid for `validity` unless a request overrides it.
    pub fn with_default_validity(validity: Duration) -> Self {
        Self { default_validity: Some(validity), ..Self::default() }
    }

    /// Routes the request to the slot for `key`, creating one bound to
    /// `acquire` if the key has not been seen. An existing slot keeps the
    /// function it was created with.
    pub async fn request<F, Fut>(&self, key: CacheKey, params: TokenRequest, acquire: F) -> Outcome<T, E>
    where
        F: Fn(TokenRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.slot(key, acquire).await.request(params).await
    }

    /// Callback flavour of [`TokenCache::request`]; `on_result` fires exactly once.
    pub async fn request_with<F, Fut, C>(&self, key: CacheKey, params: TokenRequest, acquire: F, on_result: C)
    where
        F: Fn(TokenRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        C: FnOnce(Outcome<T, E>) + Send + 'static,
    {
        self.slot(key, acquire).await.request_with(params, on_result).await
    }

    /// [`TokenCache::request`] with the key derived from `params`.
    pub async fn get_token<F, Fut>(&self, params: TokenRequest, acquire: F) -> Outcome<T, E>
    where
        F: Fn(TokenRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.request(params.cache_key(), params, acquire).await
    }

    /// Drops every slot. Acquisitions already in flight still finish, but only
    /// reach the waiters registered before the clear.
    pub async fn clear(&self) {
        let dropped = std::mem::take(&mut *self.inner.write().await);
        let metrics = get_metrics().await;
        metrics.slots.sub(dropped.len() as i64);
        metrics.cache_clears.inc();
        info!("token cache cleared, {} slot(s) dropped", dropped.len());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn status(&self, key: &CacheKey) -> Option<SlotStatus> {
        let slot = self.inner.read().await.get(key).cloned()?;
        Some(slot.status().await)
    }

    async fn slot<F, Fut>(&self, key: CacheKey, acquire: F) -> Arc<Slot<T, E>>
    where
        F: Fn(TokenRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(slot) = self.inner.read().await.get(&key) {
            return Arc::clone(slot);
        }

        let mut map = self.inner.write().await;
        // another request may have created it between the two locks
        if let Some(slot) = map.get(&key) {
            return Arc::clone(slot);
        }
        debug!("creating slot for '{}'", key);
        let slot = Arc::new(Slot::new(key.clone(), acquire_fn(acquire), self.default_validity));
        map.insert(key, Arc::clone(&slot));
        get_metrics().await.slots.inc();
        slot
    }
}

// Declare the static OnceCell to hold the default TokenCache.
static TOKEN_CACHE_INSTANCE: OnceCell<TokenCache<Token, SharedError>> = OnceCell::const_new();

/// Process-wide cache, created on first use with the one-hour default validity.
///
/// Callers that need isolation should construct their own [`TokenCache`].
pub async fn default_cache() -> &'static TokenCache<Token, SharedError> {
    init_default_cache(None).await
}

/// Creates the process-wide cache at startup. Only the first call decides
/// the default validity; later calls return the existing instance.
pub async fn init_default_cache(default_validity: Option<Duration>) -> &'static TokenCache<Token, SharedError> {
    TOKEN_CACHE_INSTANCE.get_or_init(|| async {
        info!("Initializing static TokenCache...");
        match default_validity {
            Some(validity) => TokenCache::with_default_validity(validity),
            None => TokenCache::new(),
        }
    }).await
}
