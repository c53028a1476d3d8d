//! # notifyhub-ports
//!
//! Port traits for the NotifyHub hexagonal architecture: the interfaces
//! between the domain/app layers and infrastructure. This crate depends
//! only on `domain` and `shared`; it has no knowledge of any concrete
//! platform, transport, or persistence technology.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// We deliberately use boxed futures for boundary traits (I/O-bound work),
/// rather than `async fn` in traits or the `async-trait` crate, so that
/// `Arc<dyn PlatformAdapter>` and friends stay trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod adapter;
pub mod logger;
pub mod queue_backend;
pub mod rate_limiter;
pub mod template;

pub use adapter::*;
pub use logger::*;
pub use queue_backend::*;
pub use rate_limiter::*;
pub use template::*;
