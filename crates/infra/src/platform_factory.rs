//! Platform adapter selection and construction from environment-sourced
//! credentials.
//!
//! Mirrors the teacher's provider-factory shape (a handful of named
//! constructors plus one "build whatever is configured" entry point) but
//! keyed off environment variables rather than the versioned config schema:
//! relay hosts and secrets don't belong in a document meant to be checked
//! into source control and exported as a JSON schema.

use notifyhub_adapters::{ChatPayloadFormat, ChatWebhookAdapter, SmsAdapter, SmtpAdapter, WebhookAdapter};
use notifyhub_ports::PlatformAdapter;
use notifyhub_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Env var: SMTP relay host (e.g. `smtp.example.com:587`).
pub const ENV_SMTP_RELAY: &str = "NOTIFYHUB_SMTP_RELAY";
/// Env var: SMTP username.
pub const ENV_SMTP_USERNAME: &str = "NOTIFYHUB_SMTP_USERNAME";
/// Env var: SMTP password.
pub const ENV_SMTP_PASSWORD: &str = "NOTIFYHUB_SMTP_PASSWORD";
/// Env var: SMTP from address.
pub const ENV_SMTP_FROM: &str = "NOTIFYHUB_SMTP_FROM";

/// Env var: SMS REST endpoint base URL (e.g. `https://api.twilio.com/2010-04-01`).
pub const ENV_SMS_ENDPOINT: &str = "NOTIFYHUB_SMS_ENDPOINT";
/// Env var: SMS account SID.
pub const ENV_SMS_ACCOUNT_SID: &str = "NOTIFYHUB_SMS_ACCOUNT_SID";
/// Env var: SMS auth token.
pub const ENV_SMS_AUTH_TOKEN: &str = "NOTIFYHUB_SMS_AUTH_TOKEN";
/// Env var: SMS from number (E.164).
pub const ENV_SMS_FROM_NUMBER: &str = "NOTIFYHUB_SMS_FROM_NUMBER";

fn missing_var_error(name: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::new("infra", "missing_env_var"), format!("missing required environment variable: {name}"))
        .with_metadata("variable", name)
}

fn required<'a>(env: &'a BTreeMap<String, String>, name: &'static str) -> Result<&'a str> {
    env.get(name).map(String::as_str).filter(|value| !value.is_empty()).ok_or_else(|| missing_var_error(name))
}

/// Build the SMTP adapter (registered as platform `"smtp"`) from
/// `NOTIFYHUB_SMTP_*` environment variables.
///
/// # Errors
/// Returns an error if a required variable is missing, the relay host
/// cannot be resolved into a transport, or `from_address` is not a valid
/// mailbox.
pub fn build_smtp_adapter(env: &BTreeMap<String, String>) -> Result<Arc<dyn PlatformAdapter>> {
    let relay = required(env, ENV_SMTP_RELAY)?;
    let username = required(env, ENV_SMTP_USERNAME)?.to_string();
    let password = required(env, ENV_SMTP_PASSWORD)?.to_string();
    let from = required(env, ENV_SMTP_FROM)?;
    Ok(Arc::new(SmtpAdapter::new("smtp", relay, username, password, from)?))
}

/// Build the SMS adapter (registered as platform `"sms"`) from
/// `NOTIFYHUB_SMS_*` environment variables.
///
/// # Errors
/// Returns an error if a required variable is missing, or the underlying
/// HTTP client fails to build.
pub fn build_sms_adapter(env: &BTreeMap<String, String>) -> Result<Arc<dyn PlatformAdapter>> {
    let endpoint = required(env, ENV_SMS_ENDPOINT)?.to_string();
    let account_sid = required(env, ENV_SMS_ACCOUNT_SID)?.to_string();
    let auth_token = required(env, ENV_SMS_AUTH_TOKEN)?.to_string();
    let from_number = required(env, ENV_SMS_FROM_NUMBER)?.to_string();
    Ok(Arc::new(SmsAdapter::new("sms", endpoint, account_sid, auth_token, from_number, DEFAULT_ADAPTER_TIMEOUT)?))
}

/// Build the generic webhook adapter, registered as platform `"webhook"`.
/// Needs no credentials: the destination URL travels in `Target::value`.
///
/// # Errors
/// Returns an error if the underlying HTTP client fails to build.
pub fn build_webhook_adapter() -> Result<Arc<dyn PlatformAdapter>> {
    Ok(Arc::new(WebhookAdapter::new("webhook", DEFAULT_ADAPTER_TIMEOUT)?))
}

/// Build the chat-webhook adapters, one per well-known payload shape:
/// `"slack"`, `"discord"`, and a vendor-neutral `"chat"`. Like the generic
/// webhook adapter, these need no credentials.
///
/// # Errors
/// Returns an error if any underlying HTTP client fails to build.
pub fn build_chat_webhook_adapters() -> Result<Vec<Arc<dyn PlatformAdapter>>> {
    Ok(vec![
        Arc::new(ChatWebhookAdapter::new("slack", ChatPayloadFormat::Slack, DEFAULT_ADAPTER_TIMEOUT)?),
        Arc::new(ChatWebhookAdapter::new("discord", ChatPayloadFormat::Discord, DEFAULT_ADAPTER_TIMEOUT)?),
        Arc::new(ChatWebhookAdapter::new("chat", ChatPayloadFormat::Generic, DEFAULT_ADAPTER_TIMEOUT)?),
    ])
}

/// Build every platform adapter this deployment has credentials for.
///
/// The generic webhook and chat-webhook adapters are always included (they
/// need no credentials beyond the target's own URL). SMTP is included only
/// when [`ENV_SMTP_RELAY`] is set; SMS only when [`ENV_SMS_ENDPOINT`] is set.
///
/// # Errors
/// Returns an error only when an adapter whose credentials *are* present
/// fails to construct (e.g. an invalid relay host or from-address).
pub fn build_configured_adapters(env: &BTreeMap<String, String>) -> Result<Vec<Arc<dyn PlatformAdapter>>> {
    let mut adapters = vec![build_webhook_adapter()?];
    adapters.extend(build_chat_webhook_adapters()?);

    if env.contains_key(ENV_SMTP_RELAY) {
        adapters.push(build_smtp_adapter(env)?);
    }
    if env.contains_key(ENV_SMS_ENDPOINT) {
        adapters.push(build_sms_adapter(env)?);
    }

    Ok(adapters)
}
