//! Single-flight cell holding the token for one cache key.
//!
//! A slot moves through three states:
//!
//! ```text
//!   Expired --request--> Pending --success--> Completed
//!      ^                    |                     |
//!      +------failure-------+                     |
//!      +-------------request after expiry---------+
//! ```
//!
//! While `Pending`, every request joins the waiter queue instead of starting
//! another acquisition. When the acquisition resolves, waiters are called in
//! arrival order with the same outcome. Expiry is only checked when the slot
//! is accessed; nothing runs in the background.
//!
//! There is no timeout: an acquisition that never resolves keeps the slot
//! `Pending` and its waiters are never called.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::error::AcquireError;
use crate::cache::key::{CacheKey, TokenRequest};
use crate::helpers::time::{expires_at_utc, get_instant, get_validity, instant_to_utc, is_fresh};
use crate::observability::metrics::{get_metrics, OUTCOME_ACQUIRE, OUTCOME_HIT, OUTCOME_QUEUED};

pub type Outcome<T, E> = Result<T, AcquireError<E>>;

/// Asynchronous acquisition function a slot is bound to.
pub type AcquireFn<T, E> =
    Arc<dyn Fn(TokenRequest) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

type Waiter<T, E> = Box<dyn FnOnce(Outcome<T, E>) + Send>;

/// Boxes a plain async function into an [`AcquireFn`].
pub fn acquire_fn<T, E, F, Fut>(acquire: F) -> AcquireFn<T, E>
where
    F: Fn(TokenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move |request| acquire(request).boxed())
}

enum SlotState<T, E> {
    Expired,
    Pending {
        waiters: Vec<Waiter<T, E>>,
    },
    Completed {
        token: T,
        issued_at: Instant,
        valid_for: Duration,
    },
}

/// Point-in-time view of a slot.
///
/// A `Completed` slot whose window has passed is still reported as
/// `Completed` until the next request notices the expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Expired,
    Pending {
        waiters: usize,
    },
    Completed {
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
}

pub struct Slot<T, E> {
    key: CacheKey,
    acquire: AcquireFn<T, E>,
    default_validity: Option<Duration>,
    state: Mutex<SlotState<T, E>>,
}

impl<T, E> Slot<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(key: CacheKey, acquire: AcquireFn<T, E>, default_validity: Option<Duration>) -> Self {
        Self {
            key,
            acquire,
            default_validity,
            state: Mutex::new(SlotState::Expired),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Resolves to the cached token, or to the outcome of the acquisition
    /// this request started or joined.
    pub async fn request(self: &Arc<Self>, params: TokenRequest) -> Outcome<T, E> {
        let (sender, receiver) = oneshot::channel();
        self.request_with(params, move |outcome| {
            let _ = sender.send(outcome);
        })
        .await;
        receiver.await.unwrap_or(Err(AcquireError::Abandoned))
    }

    /// Callback flavour of [`Slot::request`].
    ///
    /// `on_result` is called exactly once: inline when a fresh token is
    /// cached, otherwise from the acquisition task once it resolves.
    pub async fn request_with<F>(self: &Arc<Self>, params: TokenRequest, on_result: F)
    where
        F: FnOnce(Outcome<T, E>) + Send + 'static,
    {
        let metrics = get_metrics().await;
        let mut state = self.state.lock().await;

        let cached = match &*state {
            SlotState::Completed { token, issued_at, valid_for } if is_fresh(*issued_at, *valid_for) => {
                Some(token.clone())
            }
            _ => None,
        };
        if let Some(token) = cached {
            drop(state);
            metrics.requests.with_label_values(&[OUTCOME_HIT]).inc();
            debug!("serving cached token for '{}'", self.key);
            on_result(Ok(token));
            return;
        }

        if let SlotState::Completed { valid_for, .. } = &*state {
            debug!("token for '{}' expired after {:?}", self.key, valid_for);
            *state = SlotState::Expired;
        }

        match &mut *state {
            SlotState::Pending { waiters } => {
                waiters.push(Box::new(on_result));
                metrics.requests.with_label_values(&[OUTCOME_QUEUED]).inc();
                debug!("'{}' joined pending acquisition, waiters: {}", self.key, waiters.len());
            }
            // expired: this request starts the acquisition
            _ => {
                *state = SlotState::Pending { waiters: vec![Box::new(on_result)] };
                metrics.requests.with_label_values(&[OUTCOME_ACQUIRE]).inc();
                debug!("starting acquisition for '{}'", self.key);
                tokio::spawn(Arc::clone(self).acquire_and_settle(params));
            }
        }
    }

    pub async fn status(&self) -> SlotStatus {
        match &*self.state.lock().await {
            SlotState::Expired => SlotStatus::Expired,
            SlotState::Pending { waiters } => SlotStatus::Pending { waiters: waiters.len() },
            SlotState::Completed { issued_at, valid_for, .. } => {
                let issued_at = instant_to_utc(*issued_at);
                SlotStatus::Completed {
                    issued_at,
                    expires_at: expires_at_utc(issued_at, *valid_for),
                }
            }
        }
    }

    async fn acquire_and_settle(self: Arc<Self>, params: TokenRequest) {
        let metrics = get_metrics().await;
        metrics.acquisitions.inc();

        let valid_for = get_validity(params.expiration, self.default_validity);
        let acquire = Arc::clone(&self.acquire);
        let attempt = async move { acquire(params).await };

        let start = get_instant();
        let outcome = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(err)) => Err(AcquireError::Failed(err)),
            Err(_) => Err(AcquireError::Abandoned),
        };
        let elapsed = start.elapsed();

        match &outcome {
            Ok(_) => {
                metrics.acquisition_duration.with_label_values(&["success"]).observe(elapsed.as_secs_f64());
                info!("acquired token for '{}' in {:?}, valid for {:?}", self.key, elapsed, valid_for);
            }
            Err(err) => {
                metrics.acquisition_duration.with_label_values(&["failure"]).observe(elapsed.as_secs_f64());
                metrics.acquisition_failures.with_label_values(&[err.reason()]).inc();
                match err {
                    AcquireError::Failed(_) => warn!("acquisition for '{}' failed after {:?}", self.key, elapsed),
                    AcquireError::Abandoned => error!("acquisition for '{}' panicked after {:?}", self.key, elapsed),
                }
            }
        }

        self.settle(outcome, valid_for).await;
    }

    /// Leaves `Pending` and drains the waiter queue in arrival order.
    async fn settle(&self, outcome: Outcome<T, E>, valid_for: Duration) {
        let waiters = {
            let mut state = self.state.lock().await;
            let SlotState::Pending { waiters } = std::mem::replace(&mut *state, SlotState::Expired) else {
                debug_assert!(false, "acquisition settled on a slot that was not pending");
                return;
            };
            if let Ok(token) = &outcome {
                *state = SlotState::Completed {
                    token: token.clone(),
                    issued_at: get_instant(),
                    valid_for,
                };
            }
            waiters
        };

        debug!("notifying {} waiter(s) for '{}'", waiters.len(), self.key);
        for waiter in waiters {
            waiter(outcome.clone());
        }
    }
}
