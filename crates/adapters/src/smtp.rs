//! SMTP platform adapter, built on `lettre`'s async transport.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor};
use notifyhub_domain::{Message, SendResult, Target};
use notifyhub_ports::BoxFuture;
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::time::{Instant, SystemTime};

/// Delivers messages over SMTP. `Target::value` must be a valid email
/// address; the message title becomes the subject and the body is sent as
/// plain text (HTML/Markdown rendering, if any, happens upstream).
pub struct SmtpAdapter {
    name: String,
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpAdapter {
    /// Build an SMTP adapter for `relay`, authenticating with `username`/`password`.
    ///
    /// # Errors
    /// Returns an error if the relay host cannot be resolved into a transport
    /// or `from_address` is not a valid mailbox.
    pub fn new(name: impl Into<String>, relay: &str, username: String, password: String, from_address: &str) -> Result<Self> {
        let from = from_address.parse::<Mailbox>().map_err(|error| {
            ErrorEnvelope::expected(ErrorCode::validation(), format!("invalid from address '{from_address}': {error}"))
        })?;
        let creds = Credentials::new(username, password);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
            .map_err(|error| {
                ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("failed to build SMTP relay for '{relay}': {error}"), ErrorClass::NonRetriable)
            })?
            .credentials(creds)
            .build();
        Ok(Self { name: name.into(), from, transport })
    }

    fn build_mail(&self, message: &Message, target: &Target) -> Result<LettreMessage> {
        let to = target.value.parse::<Mailbox>().map_err(|error| {
            ErrorEnvelope::expected(ErrorCode::validation(), format!("invalid target address '{}': {error}", target.value))
        })?;
        LettreMessage::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.title)
            .body(message.body.clone())
            .map_err(|error| {
                ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("failed to build email: {error}"), ErrorClass::NonRetriable)
            })
    }

    async fn send_one(&self, ctx: &RequestContext, message: &Message, target: &Target) -> Result<()> {
        ctx.ensure_not_cancelled("smtp.send")?;
        let mail = self.build_mail(message, target)?;
        let send = self.transport.send(mail);
        tokio::select! {
            () = ctx.cancelled() => Err(ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", "smtp.send")),
            result = send => result.map(|_| ()).map_err(|error| {
                ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("SMTP send failed: {error}"), ErrorClass::Retriable)
            }),
        }
    }
}

impl notifyhub_ports::PlatformAdapter for SmtpAdapter {
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
        target.target_type == "email" && target.value.parse::<Mailbox>().is_ok()
    }

    fn health<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("smtp.health")?;
            let connected = self.transport.test_connection().await.map_err(|error| {
                ErrorEnvelope::unexpected(ErrorCode::adapter(), format!("SMTP health check failed: {error}"), ErrorClass::Retriable)
            })?;
            if connected {
                Ok(())
            } else {
                Err(ErrorEnvelope::unexpected(ErrorCode::adapter(), "SMTP relay did not accept the test connection", ErrorClass::Retriable))
            }
        })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_from_address() {
        let result = SmtpAdapter::new("smtp", "smtp.example.com", "user".to_string(), "pass".to_string(), "not-an-email");
        assert!(result.is_err());
    }

    #[test]
    fn supports_target_requires_email_type_and_valid_mailbox() {
        let adapter = SmtpAdapter::new("smtp", "smtp.example.com", "user".to_string(), "pass".to_string(), "from@example.com").expect("adapter");
        let good = Target::builder("email", "to@example.com", "smtp").build().expect("target");
        let wrong_type = Target::builder("webhook", "to@example.com", "smtp").build().expect("target");
        let bad_value = Target::builder("email", "not-an-email", "smtp").build().expect("target");
        assert!(adapter.supports_target(&good));
        assert!(!adapter.supports_target(&wrong_type));
        assert!(!adapter.supports_target(&bad_value));
    }
}
