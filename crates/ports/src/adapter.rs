//! Platform adapter boundary contract.

use crate::BoxFuture;
use notifyhub_domain::{Message, SendResult, Target};
use notifyhub_shared::{RequestContext, Result};

/// Uniform polymorphic surface every platform collaborator (chat webhook,
/// SMTP, SMS, generic webhook, …) must implement. The dispatcher consumes
/// this contract; core does not specify any wire format.
pub trait PlatformAdapter: Send + Sync {
    /// Stable adapter name, matched against [`Target::platform`].
    fn name(&self) -> &str;

    /// Deliver `message` to the given subset of its targets.
    ///
    /// Returns one [`SendResult`] per target, in the same order as `targets`.
    /// The outer `Result` is `Err` only when the adapter is fundamentally
    /// unable to attempt delivery (e.g. misconfigured credentials); a target
    /// that fails at the protocol level is still a successful outer `Ok`
    /// carrying a failed [`SendResult`].
    fn send<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: &'a Message,
        targets: &'a [Target],
    ) -> BoxFuture<'a, Result<Vec<SendResult>>>;

    /// Whether this adapter is prepared to handle `target`.
    fn supports_target(&self, target: &Target) -> bool;

    /// Liveness check for the adapter's downstream dependency (SMTP server,
    /// webhook endpoint reachability, API credentials, …).
    fn health<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>>;

    /// Release any held resources (connection pools, background tasks).
    fn shutdown<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>>;
}
