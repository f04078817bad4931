#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use tokio::sync::oneshot;

    use crate::cache::{AcquireError, SlotStatus, TokenRequest};
    use crate::tests::common::{calls, counting_acquirer, failing_once_acquirer, key_of, request_a, TestCache};

    #[tokio::test(start_paused = true)]
    async fn failure_reaches_every_waiter_and_is_not_cached() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = TestCache::new();
        let request = TokenRequest::new("B", &["scope1"]);
        let key = key_of(&request);

        let (first, second) = tokio::join!(
            cache.request(key.clone(), request.clone(), failing_once_acquirer(counter.clone())),
            cache.request(key.clone(), request.clone(), failing_once_acquirer(counter.clone())),
        );
        assert_eq!(first, Err(AcquireError::Failed("E".to_string())));
        assert_eq!(second, Err(AcquireError::Failed("E".to_string())));
        assert_eq!(calls(&counter), 1);
        assert_eq!(cache.status(&key).await, Some(SlotStatus::Expired));

        let retried = cache.request(key.clone(), request.clone(), failing_once_acquirer(counter.clone())).await;
        assert_eq!(retried, Ok("T2".to_string()));
        assert_eq!(calls(&counter), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_value_is_forwarded_verbatim() {
        let cache: crate::cache::TokenCache<String, (u16, String)> = crate::cache::TokenCache::new();
        let outcome = cache
            .get_token(request_a(), |_request| async { Err((503, "unavailable".to_string())) })
            .await;

        let err = outcome.unwrap_err();
        assert_eq!(err.source_error(), Some(&(503, "unavailable".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forces_fresh_acquisition() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = TestCache::new();

        assert_eq!(cache.get_token(request_a(), counting_acquirer(counter.clone())).await, Ok("T1".to_string()));
        cache.clear().await;
        assert!(cache.is_empty().await);

        assert_eq!(cache.get_token(request_a(), counting_acquirer(counter.clone())).await, Ok("T2".to_string()));
        assert_eq!(calls(&counter), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_does_not_cancel_in_flight_work() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = TestCache::new();
        let key = key_of(&request_a());

        // registered on the slot that is about to be orphaned
        let (sender, orphaned) = oneshot::channel();
        cache
            .request_with(key.clone(), request_a(), counting_acquirer(counter.clone()), move |outcome| {
                let _ = sender.send(outcome);
            })
            .await;

        cache.clear().await;

        // builds a new slot and acquires independently of the stale attempt
        let fresh = cache.request(key.clone(), request_a(), counting_acquirer(counter.clone())).await;

        let orphaned = orphaned.await.unwrap().unwrap();
        let fresh = fresh.unwrap();
        assert_ne!(orphaned, fresh);
        assert_eq!(calls(&counter), 2);

        // the orphaned result never lands in the new slot
        assert_eq!(
            cache.get_token(request_a(), counting_acquirer(counter.clone())).await,
            Ok(fresh)
        );
    }
}
