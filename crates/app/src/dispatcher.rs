//! The dispatcher contract: fan a [`Message`] out to platform adapters and
//! merge the results into a [`Receipt`].

use notifyhub_domain::{Message, Receipt, SendResult, Target};
use notifyhub_ports::PlatformAdapter;
use notifyhub_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Core's contract with the platform-adapter layer: resolve adapters for a
/// message's targets, invoke them, and assemble an aggregated [`Receipt`].
pub trait Dispatcher: Send + Sync {
    /// Deliver `message` to every target's resolved adapter and merge the
    /// outcomes into a single [`Receipt`].
    ///
    /// # Errors
    /// Returns [`ErrorCode::no_targets`] when `message.targets` is empty.
    /// A target whose platform is unregistered, or whose adapter declines it
    /// via `supports_target`, is reported as a failed [`SendResult`] rather
    /// than failing the whole call.
    fn dispatch<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: &'a Message,
    ) -> notifyhub_ports::BoxFuture<'a, Result<Receipt>>;

    /// Liveness check across every registered adapter.
    fn health<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> notifyhub_ports::BoxFuture<'a, HashMap<String, Result<()>>>;
}

/// Reference implementation of [`Dispatcher`]: a per-instance registry of
/// [`PlatformAdapter`]s keyed by name, matched against `Target::platform`.
///
/// Deliberately *not* a process-global registry (see the design notes'
/// redesign flag on global platform registries) — each [`DefaultDispatcher`]
/// owns its own table, so multiple executors in one process stay
/// independent.
pub struct DefaultDispatcher {
    adapters: HashMap<String, Arc<dyn PlatformAdapter>>,
}

impl DefaultDispatcher {
    /// Create an empty dispatcher; call [`DefaultDispatcher::register_platform`]
    /// to wire in adapters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter under its own [`PlatformAdapter::name`].
    pub fn register_platform(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    fn group_targets<'a>(message: &'a Message) -> HashMap<&'a str, Vec<(usize, &'a Target)>> {
        let mut grouped: HashMap<&str, Vec<(usize, &Target)>> = HashMap::new();
        for (index, target) in message.targets.iter().enumerate() {
            grouped
                .entry(target.platform.as_str())
                .or_default()
                .push((index, target));
        }
        grouped
    }
}

impl Default for DefaultDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for DefaultDispatcher {
    fn dispatch<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: &'a Message,
    ) -> notifyhub_ports::BoxFuture<'a, Result<Receipt>> {
        Box::pin(async move {
            if message.targets.is_empty() {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::no_targets(),
                    "message has no targets to dispatch",
                ));
            }

            let grouped = Self::group_targets(message);
            let mut per_platform_futures = Vec::with_capacity(grouped.len());

            for (platform, indexed_targets) in grouped {
                let adapter = self.adapters.get(platform).cloned();
                per_platform_futures.push(async move {
                    dispatch_to_platform(ctx, message, platform, indexed_targets, adapter).await
                });
            }

            let per_platform_results = futures_util::future::join_all(per_platform_futures).await;

            let mut indexed: Vec<(usize, SendResult)> =
                per_platform_results.into_iter().flatten().collect();
            indexed.sort_by_key(|(index, _)| *index);
            let results: Vec<SendResult> = indexed.into_iter().map(|(_, result)| result).collect();

            Ok(Receipt::from_results(
                message.id.clone(),
                results,
                SystemTime::now(),
            ))
        })
    }

    fn health<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> notifyhub_ports::BoxFuture<'a, HashMap<String, Result<()>>> {
        Box::pin(async move {
            let mut statuses = HashMap::with_capacity(self.adapters.len());
            for (name, adapter) in &self.adapters {
                statuses.insert(name.clone(), adapter.health(ctx).await);
            }
            statuses
        })
    }
}

async fn dispatch_to_platform(
    ctx: &RequestContext,
    message: &Message,
    platform: &str,
    indexed_targets: Vec<(usize, &Target)>,
    adapter: Option<Arc<dyn PlatformAdapter>>,
) -> Vec<(usize, SendResult)> {
    let Some(adapter) = adapter else {
        return indexed_targets
            .into_iter()
            .map(|(index, target)| {
                (
                    index,
                    SendResult::failure(
                        target.clone(),
                        platform,
                        "unknown platform",
                        SystemTime::now(),
                        std::time::Duration::ZERO,
                        0,
                    ),
                )
            })
            .collect();
    };

    let mut supported_targets = Vec::new();
    let mut unsupported = Vec::new();
    for (index, target) in indexed_targets {
        if adapter.supports_target(target) {
            supported_targets.push((index, target.clone()));
        } else {
            unsupported.push((
                index,
                SendResult::failure(
                    target.clone(),
                    platform,
                    "unsupported target",
                    SystemTime::now(),
                    std::time::Duration::ZERO,
                    0,
                ),
            ));
        }
    }

    if supported_targets.is_empty() {
        return unsupported;
    }

    let targets: Vec<Target> = supported_targets.iter().map(|(_, target)| target.clone()).collect();
    let started_at = SystemTime::now();
    let send_outcome = adapter.send(ctx, message, &targets).await;

    let mut results = match send_outcome {
        Ok(send_results) => supported_targets
            .into_iter()
            .zip(send_results)
            .map(|((index, _), result)| (index, result))
            .collect(),
        Err(error) => supported_targets
            .into_iter()
            .map(|(index, target)| {
                (
                    index,
                    SendResult::failure(
                        target,
                        platform,
                        error.message.clone(),
                        started_at,
                        started_at.elapsed().unwrap_or_default(),
                        1,
                    ),
                )
            })
            .collect(),
    };

    results.extend(unsupported);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_domain::MessageId;
    use notifyhub_ports::BoxFuture;
    use notifyhub_shared::CorrelationId;
    use std::time::Duration;

    struct AlwaysSucceeds;

    impl PlatformAdapter for AlwaysSucceeds {
        fn name(&self) -> &str {
            "email"
        }

        fn send<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _message: &'a Message,
            targets: &'a [Target],
        ) -> BoxFuture<'a, Result<Vec<SendResult>>> {
            Box::pin(async move {
                Ok(targets
                    .iter()
                    .map(|target| {
                        SendResult::success(
                            target.clone(),
                            "email",
                            SystemTime::now(),
                            Duration::from_millis(1),
                            1,
                        )
                    })
                    .collect())
            })
        }

        fn supports_target(&self, _target: &Target) -> bool {
            true
        }

        fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct RejectsEverything;

    impl PlatformAdapter for RejectsEverything {
        fn name(&self) -> &str {
            "sms"
        }

        fn send<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _message: &'a Message,
            _targets: &'a [Target],
        ) -> BoxFuture<'a, Result<Vec<SendResult>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn supports_target(&self, _target: &Target) -> bool {
            false
        }

        fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(CorrelationId::new_request_id())
    }

    #[tokio::test]
    async fn dispatch_rejects_empty_targets() {
        let dispatcher = DefaultDispatcher::new();
        let message = Message {
            id: MessageId::generate(),
            title: "hi".into(),
            body: "there".into(),
            format: notifyhub_domain::MessageFormat::Text,
            priority: notifyhub_domain::Priority::Normal,
            targets: Vec::new(),
            variables: HashMap::new(),
            metadata: HashMap::new(),
            platform_data: HashMap::new(),
            created_at: SystemTime::now(),
            scheduled_at: None,
        };
        let result = dispatcher.dispatch(&ctx(), &message).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_platform_is_reported_not_fatal() {
        let dispatcher = DefaultDispatcher::new();
        let message = Message::builder("hi", "there")
            .target(
                Target::builder("email", "a@example.com", "missing")
                    .build()
                    .expect("valid target"),
            )
            .build()
            .expect("valid message");

        let receipt = dispatcher.dispatch(&ctx(), &message).await.expect("dispatch");
        assert_eq!(receipt.total, 1);
        assert_eq!(receipt.failed, 1);
        assert_eq!(receipt.results[0].error, "unknown platform");
    }

    #[tokio::test]
    async fn partial_success_across_platforms() {
        let mut dispatcher = DefaultDispatcher::new();
        dispatcher.register_platform(Arc::new(AlwaysSucceeds));
        dispatcher.register_platform(Arc::new(RejectsEverything));

        let message = Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "email").build().expect("valid"))
            .target(Target::builder("phone", "+15550000", "sms").build().expect("valid"))
            .build()
            .expect("valid message");

        let receipt = dispatcher.dispatch(&ctx(), &message).await.expect("dispatch");
        assert_eq!(receipt.total, 2);
        assert_eq!(receipt.successful, 1);
        assert_eq!(receipt.failed, 1);
        assert_eq!(receipt.status, notifyhub_domain::ReceiptStatus::Partial);
    }
}
