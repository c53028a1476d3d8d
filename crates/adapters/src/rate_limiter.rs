//! Rate limiter collaborators: a no-op default and a token-bucket
//! implementation.

use notifyhub_ports::BoxFuture;
use notifyhub_ports::RateLimiter;
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admits every request immediately. The default collaborator when no rate
/// limiting is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

impl RateLimiter for AlwaysAllow {
    fn consume_with_timeout<'a>(&'a self, _ctx: &'a RequestContext, _timeout: Duration) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A classic token bucket: `capacity` tokens, refilled continuously at
/// `refill_per_second`. One token is consumed per admitted call.
pub struct TokenBucketRateLimiter {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

impl TokenBucketRateLimiter {
    /// Build a bucket starting full, refilling at `refill_per_second` tokens
    /// per second up to `capacity`.
    #[must_use]
    pub fn new(capacity: u32, refill_per_second: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_second: f64::from(refill_per_second.max(1)),
            state: Mutex::new(BucketState { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    fn try_consume(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_second).min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter for TokenBucketRateLimiter {
    fn consume_with_timeout<'a>(&'a self, ctx: &'a RequestContext, timeout: Duration) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("rate_limiter.consume")?;
            let deadline = Instant::now() + timeout;
            loop {
                if self.try_consume() {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(ErrorEnvelope::unexpected(
                        ErrorCode::timeout(),
                        "rate limiter did not admit the request before the timeout elapsed",
                        ErrorClass::Retriable,
                    ));
                }
                tokio::select! {
                    () = ctx.cancelled() => return Err(ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", "rate_limiter.consume")),
                    () = tokio::time::sleep(Duration::from_millis(10)) => {}
                }
            }
        })
    }
}
