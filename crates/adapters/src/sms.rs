//! SMS platform adapter, speaking a Twilio-style REST API.
//!
//! The exact wire contract of any one SMS vendor is out of scope (spec.md §1
//! Non-goals name specific third-party integrations); this adapter targets
//! the common shape — basic-auth POST of form-encoded `To`/`From`/`Body` to
//! an account-scoped messages endpoint — that Twilio and several
//! Twilio-compatible providers share.

use notifyhub_domain::{Message, SendResult, Target};
use notifyhub_ports::BoxFuture;
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use reqwest::Client;
use std::time::{Duration, Instant, SystemTime};

fn looks_like_phone_number(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('+')) && chars.all(|c| c.is_ascii_digit()) && value.len() > 4
}

/// Delivers messages as SMS via a Twilio-compatible REST endpoint.
/// `Target::value` must be an E.164 phone number (e.g. `+15551234567`).
pub struct SmsAdapter {
    name: String,
    client: Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsAdapter {
    /// Build an SMS adapter against `endpoint` (the vendor's messages API
    /// base URL, e.g. `https://api.twilio.com/2010-04-01`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("failed to build SMS client: {error}"), ErrorClass::NonRetriable)
        })?;
        Ok(Self {
            name: name.into(),
            client,
            endpoint: endpoint.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        })
    }

    async fn send_one(&self, ctx: &RequestContext, message: &Message, target: &Target) -> Result<()> {
        ctx.ensure_not_cancelled("sms.send")?;
        let url = format!("{}/Accounts/{}/Messages.json", self.endpoint, self.account_sid);
        let body = format!("{}\n{}", message.title, message.body);
        let params = [("To", target.value.as_str()), ("From", self.from_number.as_str()), ("Body", body.as_str())];

        let request = self.client.post(&url).basic_auth(&self.account_sid, Some(&self.auth_token)).form(&params).send();
        let response = tokio::select! {
            () = ctx.cancelled() => return Err(ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", "sms.send")),
            result = request => result.map_err(|error| map_reqwest_error(&error))?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let class = if status.is_server_error() || status.as_u16() == 429 { ErrorClass::Retriable } else { ErrorClass::NonRetriable };
            return Err(ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("SMS provider returned {status}: {text}"), class)
                .with_metadata("status", status.as_u16().to_string()));
        }
        Ok(())
    }
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(ErrorCode::timeout(), "SMS request timed out", ErrorClass::Retriable);
    }
    ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("SMS request failed: {error}"), ErrorClass::Retriable)
}

impl notifyhub_ports::PlatformAdapter for SmsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a self, ctx: &'a RequestContext, message: &'a Message, targets: &'a [Target]) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(targets.len());
            for target in targets {
                let started_at = SystemTime::now();
                let started = Instant::now();
                let outcome = self.send_one(ctx, message, target).await;
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
        target.target_type == "phone" && looks_like_phone_number(&target.value)
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
