use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Validity window used when neither the request nor the cache supplies one.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(60 * 60);

pub fn get_validity(
    validity_request: Option<Duration>,
    validity_cache: Option<Duration>,
) -> Duration {
    // request level
    validity_request
        // cache level
        .or(validity_cache)
        .unwrap_or(DEFAULT_VALIDITY)
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// `None` when the window reaches past what `Instant` can represent;
/// such a token never expires.
pub fn get_deadline(issued_at: Instant, valid_for: Duration) -> Option<Instant> {
    issued_at.checked_add(valid_for)
}

pub fn is_fresh(issued_at: Instant, valid_for: Duration) -> bool {
    get_deadline(issued_at, valid_for).map_or(true, |deadline| get_instant() < deadline)
}

/// Wall-clock end of a validity window, saturating at `DateTime::MAX_UTC`.
pub fn expires_at_utc(issued_at: DateTime<Utc>, valid_for: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(valid_for)
        .ok()
        .and_then(|window| issued_at.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wall-clock time corresponding to a monotonic instant, saturating at the
/// representable range.
pub fn instant_to_utc(instant: Instant) -> DateTime<Utc> {
    let now = get_instant();
    let wall = now_utc();
    if instant <= now {
        chrono::Duration::from_std(now - instant)
            .ok()
            .and_then(|offset| wall.checked_sub_signed(offset))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    } else {
        chrono::Duration::from_std(instant - now)
            .ok()
            .and_then(|offset| wall.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
