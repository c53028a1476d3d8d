//! Generic webhook and chat-webhook platform adapters.
//!
//! Both adapters speak to an arbitrary HTTP endpoint carried in
//! [`Target::value`]; the difference is the JSON envelope each one posts.
//! `WebhookAdapter` posts the message body through almost unchanged (the
//! "generic webhook" platform from spec.md §1); `ChatWebhookAdapter` shapes
//! the body into one of a handful of well-known chat-service payloads. The
//! exact bit-for-bit payload format of any specific third-party chat service
//! is explicitly out of scope (spec.md §1 Non-goals) — `ChatPayloadFormat`
//! covers the common shapes without claiming parity with any one vendor.

use notifyhub_domain::{Message, SendResult, Target};
use notifyhub_ports::BoxFuture;
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant, SystemTime};
use url::Url;

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(ErrorCode::timeout(), "webhook request timed out", ErrorClass::Retriable);
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("webhook connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::adapter(),
        format!("webhook request failed: {error}"),
        ErrorClass::Retriable,
    )
}

async fn post_json(
    client: &Client,
    ctx: &RequestContext,
    url: &str,
    body: &Value,
    operation: &'static str,
) -> Result<()> {
    ctx.ensure_not_cancelled(operation)?;
    let response = tokio::select! {
        () = ctx.cancelled() => return Err(cancelled_error(operation)),
        result = client.post(url).json(body).send() => result.map_err(|error| map_reqwest_error(&error))?,
    };
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let class = if status.is_server_error() || status.as_u16() == 429 {
            ErrorClass::Retriable
        } else {
            ErrorClass::NonRetriable
        };
        return Err(ErrorEnvelope::unexpected(
            ErrorCode::adapter(),
            format!("webhook endpoint returned {status}: {text}"),
            class,
        )
        .with_metadata("status", status.as_u16().to_string()));
    }
    Ok(())
}

fn validate_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Generic webhook adapter: posts `{title, body, format, priority, variables,
/// metadata, platformData}` as JSON to `Target::value`, which must be an
/// `http(s)://` URL.
pub struct WebhookAdapter {
    name: String,
    client: Client,
}

impl WebhookAdapter {
    /// Build a webhook adapter registered under `name` (typically `"webhook"`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(name: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("failed to build webhook client: {error}"), ErrorClass::NonRetriable)
        })?;
        Ok(Self { name: name.into(), client })
    }

    fn payload(message: &Message, target: &Target) -> Value {
        json!({
            "messageId": message.id.as_str(),
            "title": message.title,
            "body": message.body,
            "format": message.format,
            "priority": message.priority,
            "variables": message.variables,
            "metadata": message.metadata,
            "platformData": message.platform_data,
            "target": {
                "type": target.target_type,
                "value": target.value,
                "metadata": target.metadata,
            },
        })
    }
}

impl notifyhub_ports::PlatformAdapter for WebhookAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a self, ctx: &'a RequestContext, message: &'a Message, targets: &'a [Target]) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(targets.len());
            for target in targets {
                let started_at = SystemTime::now();
                let started = Instant::now();
                let outcome = post_json(&self.client, ctx, &target.value, &Self::payload(message, target), "webhook.send").await;
                let duration = started.elapsed();
                results.push(match outcome {
                    Ok(()) => SendResult::success(target.clone(), &self.name, started_at, duration, 1),
                    Err(error) => SendResult::failure(target.clone(), &self.name, error.message, started_at, duration, 1),
                });
            }
            Ok(results)
        })
    }

    fn supports_target(&self, target: &Target) -> bool {
        validate_url(&target.value)
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Well-known chat-service payload shapes. `Generic` matches
/// [`WebhookAdapter`]'s own envelope; `Slack`/`Discord` approximate the two
/// most common incoming-webhook conventions (`text` vs `content`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPayloadFormat {
    /// `{"text": "<title>\n<body>"}`, the Slack incoming-webhook convention.
    Slack,
    /// `{"content": "<title>\n<body>"}`, the Discord incoming-webhook convention.
    Discord,
    /// The same envelope `WebhookAdapter` posts.
    Generic,
}

/// Chat-webhook adapter: same transport as [`WebhookAdapter`], a
/// vendor-shaped payload.
pub struct ChatWebhookAdapter {
    name: String,
    client: Client,
    format: ChatPayloadFormat,
}

impl ChatWebhookAdapter {
    /// Build a chat-webhook adapter registered under `name` (e.g. `"slack"`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(name: impl Into<String>, format: ChatPayloadFormat, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("failed to build chat webhook client: {error}"), ErrorClass::NonRetriable)
        })?;
        Ok(Self { name: name.into(), client, format })
    }

    fn payload(&self, message: &Message, target: &Target) -> Value {
        let combined = format!("{}\n{}", message.title, message.body);
        match self.format {
            ChatPayloadFormat::Slack => json!({ "text": combined }),
            ChatPayloadFormat::Discord => json!({ "content": combined }),
            ChatPayloadFormat::Generic => WebhookAdapter::payload(message, target),
        }
    }
}

impl notifyhub_ports::PlatformAdapter for ChatWebhookAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a self, ctx: &'a RequestContext, message: &'a Message, targets: &'a [Target]) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(targets.len());
            for target in targets {
                let started_at = SystemTime::now();
                let started = Instant::now();
                let payload = self.payload(message, target);
                let outcome = post_json(&self.client, ctx, &target.value, &payload, "chat_webhook.send").await;
                let duration = started.elapsed();
                results.push(match outcome {
                    Ok(()) => SendResult::success(target.clone(), &self.name, started_at, duration, 1),
                    Err(error) => SendResult::failure(target.clone(), &self.name, error.message, started_at, duration, 1),
                });
            }
            Ok(results)
        })
    }

    fn supports_target(&self, target: &Target) -> bool {
        target.target_type == "webhook" && validate_url(&target.value)
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
