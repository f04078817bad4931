// tests/common/mod.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::time::sleep;

use crate::cache::{CacheKey, TokenCache, TokenRequest};

pub type TestCache = TokenCache<String, String>;

pub const ACQUIRE_DELAY: Duration = Duration::from_millis(100);

/// Request for key `A:scope1,scope2`.
pub fn request_a() -> TokenRequest {
    TokenRequest::new("A", &["scope1", "scope2"])
}

pub fn key_of(request: &TokenRequest) -> CacheKey {
    request.cache_key()
}

/// Acquisition that takes `ACQUIRE_DELAY` and returns `T1`, `T2`, ... in call order.
pub fn counting_acquirer(
    calls: Arc<AtomicUsize>,
) -> impl Fn(TokenRequest) -> BoxFuture<'static, Result<String, String>> + Send + Sync + 'static {
    move |_request| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            sleep(ACQUIRE_DELAY).await;
            Ok(format!("T{}", n))
        }
        .boxed()
    }
}

/// Acquisition that fails with `E` on the first call and succeeds afterwards.
pub fn failing_once_acquirer(
    calls: Arc<AtomicUsize>,
) -> impl Fn(TokenRequest) -> BoxFuture<'static, Result<String, String>> + Send + Sync + 'static {
    move |_request| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            sleep(ACQUIRE_DELAY).await;
            if n == 1 {
                Err("E".to_string())
            } else {
                Ok(format!("T{}", n))
            }
        }
        .boxed()
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
