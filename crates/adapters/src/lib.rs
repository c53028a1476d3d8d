//! # notifyhub-adapters
//!
//! Concrete `PlatformAdapter`, `RateLimiter`, `TemplateEngine`, and `Logger`
//! implementations for notifyhub. This crate depends only on `domain`,
//! `ports`, and `shared` — it never depends on `app` or `infra`, which wire
//! these adapters together behind the public facade.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod logger;
pub mod rate_limiter;
#[cfg(feature = "smtp")]
pub mod smtp;
pub mod template;
#[cfg(feature = "webhook")]
pub mod sms;
#[cfg(feature = "webhook")]
pub mod webhook;

pub use logger::{NoopLogger, TracingLogger};
pub use rate_limiter::{AlwaysAllow, TokenBucketRateLimiter};
#[cfg(feature = "smtp")]
pub use smtp::SmtpAdapter;
#[cfg(feature = "webhook")]
pub use sms::SmsAdapter;
pub use template::SimpleTemplateEngine;
#[cfg(feature = "webhook")]
pub use webhook::{ChatPayloadFormat, ChatWebhookAdapter, WebhookAdapter};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
