//! # notifyhub-app
//!
//! The application layer: queue items and handles, the dispatcher contract
//! over platform adapters, the elastic worker pool, the callback registry,
//! and the async executor that ties them together behind `ScheduleAsync`/
//! `ScheduleBatch`.
//!
//! ## Dependency Rules
//!
//! - Depends on `domain`, `shared`, `queue`, and `ports` (the adapter trait)
//! - No dependency on concrete adapters, config, or the facade crate

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod batch_registry;
pub mod callback_registry;
pub mod dispatcher;
pub mod executor;
pub mod handle;
pub mod handle_registry;
pub mod queue_item;
pub mod worker_pool;

pub use batch_registry::BatchRegistry;
pub use callback_registry::{
    CallbackKind, CallbackRegistry, CallbackRegistryConfig, CallbackRegistryStats, CallbackRetryPolicy, CallbackSet,
    DeadLetter, ExecutionState, PerfSnapshot,
};
pub use dispatcher::{DefaultDispatcher, Dispatcher};
pub use executor::{AsyncExecutor, AsyncOption, ExecutorConfig, ExecutorStats, DEFAULT_QUEUE_CAPACITY};
pub use handle::{AlreadyTerminal, AsyncResult, BatchHandle, BatchProgress, Handle, HandleSnapshot};
pub use handle_registry::{HandleRegistry, DEFAULT_CAPACITY as DEFAULT_HANDLE_CAPACITY, DEFAULT_TTL as DEFAULT_HANDLE_TTL};
pub use queue_item::{BatchInfo, DelayedItem, QueueItem};
pub use worker_pool::{
    HealthEvent, LoadBalancerStrategy, TimeoutExceeded, WorkerAffinity, WorkerPool, WorkerPoolConfig, WorkerState,
    WorkerStats,
};

/// Returns the application crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }
}
