//! Contract-style tests for port traits using in-memory test doubles.

use notifyhub_ports::{Logger, PersistedQueueItem, PlatformAdapter, QueueBackend};
use notifyhub_shared::{RequestContext, Result};
use notifyhub_testkit::in_memory::{
    message_fixture, InMemoryQueueBackend, MockPlatformAdapter, MockSendOutcome, RecordingLogger,
};
use std::time::SystemTime;

#[tokio::test]
async fn platform_adapter_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_request();
    let adapter = MockPlatformAdapter::new("webhook");
    let message = message_fixture("webhook");

    adapter.health(&ctx).await?;

    let results = adapter.send(&ctx, &message, &message.targets).await?;
    assert_eq!(results.len(), 1);
    assert!(results[0].success);

    adapter.shutdown(&ctx).await?;
    Ok(())
}

#[tokio::test]
async fn platform_adapter_contract_surfaces_adapter_errors() -> Result<()> {
    let ctx = RequestContext::new_request();
    let adapter = MockPlatformAdapter::new("webhook");
    adapter
        .push_outcome(MockSendOutcome::AdapterError {
            error: "credentials rejected".to_string(),
            retriable: false,
        })
        .await;
    let message = message_fixture("webhook");

    let outcome = adapter.send(&ctx, &message, &message.targets).await;
    assert!(outcome.is_err());
    Ok(())
}

#[tokio::test]
async fn queue_backend_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_request();
    let backend = InMemoryQueueBackend::new();
    let message = message_fixture("webhook");

    assert_eq!(backend.size(&ctx).await?, 0);

    backend
        .enqueue(
            &ctx,
            PersistedQueueItem {
                message_id: message.id.clone(),
                payload: b"hello".to_vec(),
                priority: message.priority,
                queued_at: SystemTime::now(),
                batch_id: None,
            },
        )
        .await?;

    assert_eq!(backend.size(&ctx).await?, 1);
    let item = backend.dequeue(&ctx).await?;
    assert_eq!(item.message_id, message.id);

    backend.close(&ctx).await?;
    assert!(backend.dequeue(&ctx).await.is_err());
    Ok(())
}

#[test]
fn recording_logger_does_not_panic() {
    let logger = RecordingLogger::default();
    let child = logger.child(Default::default());
    child.info("from child", None);
    assert!(logger.events().is_empty());
}
