//! Template engine boundary contract.
//!
//! Consumed only by the message-builder path, never by the core dispatch
//! loop: its output feeds a `Message`'s title/body before the message is
//! built, so validation failures surface at build time, not mid-delivery.

use crate::BoxFuture;
use notifyhub_domain::MessageFormat;
use notifyhub_shared::{Result, RequestContext};
use std::collections::HashMap;

/// Boundary contract for rendering message templates.
pub trait TemplateEngine: Send + Sync {
    /// Render `template_text` against `variables`.
    fn render<'a>(
        &'a self,
        ctx: &'a RequestContext,
        template_text: &'a str,
        variables: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<String>>;

    /// Validate that `template_text` is well-formed for the given `format`.
    ///
    /// # Errors
    /// Returns an error describing the first malformed construct found.
    fn validate(&self, template_text: &str, format: &MessageFormat) -> Result<()>;
}
