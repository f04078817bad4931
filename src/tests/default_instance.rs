#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use serial_test::serial;

    use crate::cache::{default_cache, init_default_cache, AcquireError, Token, TokenRequest};
    use crate::observability::metrics::render;

    #[tokio::test]
    #[serial]
    async fn default_cache_is_a_single_instance() {
        let first = default_cache().await;
        let second = init_default_cache(None).await;
        assert!(std::ptr::eq(first, second));
    }

    #[tokio::test]
    #[serial]
    async fn default_cache_shares_tokens_and_failures() {
        let cache = default_cache().await;
        cache.clear().await;

        let counter = Arc::new(AtomicUsize::new(0));
        let acquire = {
            let counter = counter.clone();
            move |request: TokenRequest| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if request.email == "broken@y.com" {
                        Err(Arc::new(anyhow!("issuer refused {}", request.email)))
                    } else {
                        Ok(Token::new(format!("token-{}", n)))
                    }
                }
            }
        };

        let request = TokenRequest::new("x@y.com", &["s"]);
        let (a, b) = tokio::join!(
            cache.get_token(request.clone(), acquire.clone()),
            cache.get_token(request.clone(), acquire.clone()),
        );
        assert_eq!(a.unwrap().value, "token-0");
        assert_eq!(b.unwrap().value, "token-0");

        let failed = cache.get_token(TokenRequest::new("broken@y.com", &["s"]), acquire).await;
        match failed {
            Err(AcquireError::Failed(err)) => assert!(err.to_string().contains("issuer refused")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    #[serial]
    async fn cache_activity_shows_up_in_metrics() {
        let cache = default_cache().await;
        cache
            .get_token(TokenRequest::new("metrics@y.com", &["s"]), |_request| async {
                Ok::<_, crate::cache::SharedError>(Token::new("m".into()))
            })
            .await
            .unwrap();

        let text = render().await.unwrap();
        assert!(text.contains("tokencache_requests_total"));
        assert!(text.contains("tokencache_acquisitions_total"));
        assert!(text.contains("tokencache_slots"));
        cache.clear().await;
    }
}
