//! Rate limiter boundary contract.

use crate::BoxFuture;
use notifyhub_shared::{RequestContext, Result};
use std::time::Duration;

/// Token-bucket-style admission control, consumed once per send attempt.
///
/// The default implementation is a no-op (`AlwaysAllow` in
/// `notifyhub-adapters`); a token-bucket implementation parameterised by
/// `(limit, duration)` is the expected production collaborator.
pub trait RateLimiter: Send + Sync {
    /// Block until a token is available or `timeout` elapses.
    ///
    /// # Errors
    /// Returns a timeout error when no token becomes available in time.
    fn consume_with_timeout<'a>(
        &'a self,
        ctx: &'a RequestContext,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<()>>;
}
