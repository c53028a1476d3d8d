//! A small `{{variable}}`-substitution template engine.
//!
//! No registry crate (handlebars/tera/minijinja/askama) is pulled in here:
//! none of the reference corpus this workspace is grounded on depends on one,
//! and the substitution rule spec.md needs — replace `{{name}}` with a
//! variable, leave unknown placeholders untouched — does not warrant one.

use notifyhub_domain::MessageFormat;
use notifyhub_ports::BoxFuture;
use notifyhub_ports::TemplateEngine;
use notifyhub_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::HashMap;

/// Renders `{{variable}}` placeholders by substitution, leaving any
/// placeholder with no matching variable untouched in the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTemplateEngine;

fn render_str(template_text: &str, variables: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(template_text.len());
    let mut rest = template_text;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        if let Some(end) = after_open.find("}}") {
            let name = after_open[..end].trim();
            match variables.get(name) {
                Some(value) => output.push_str(value),
                None => {
                    output.push_str("{{");
                    output.push_str(&after_open[..end]);
                    output.push_str("}}");
                },
            }
            rest = &after_open[end + 2..];
        } else {
            output.push_str("{{");
            rest = after_open;
        }
    }
    output.push_str(rest);
    output
}

impl TemplateEngine for SimpleTemplateEngine {
    fn render<'a>(
        &'a self,
        ctx: &'a RequestContext,
        template_text: &'a str,
        variables: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("template.render")?;
            Ok(render_str(template_text, variables))
        })
    }

    fn validate(&self, template_text: &str, format: &MessageFormat) -> Result<()> {
        let mut depth = 0usize;
        let mut chars = template_text.char_indices().peekable();
        while let Some((index, ch)) = chars.next() {
            if ch == '{' && template_text[index..].starts_with("{{") {
                depth += 1;
                chars.next();
            } else if ch == '}' && template_text[index..].starts_with("}}") {
                if depth == 0 {
                    return Err(ErrorEnvelope::expected(ErrorCode::validation(), "unmatched '}}' in template"));
                }
                depth -= 1;
                chars.next();
            }
        }
        if depth != 0 {
            return Err(ErrorEnvelope::expected(ErrorCode::validation(), "unmatched '{{' in template"));
        }
        if let MessageFormat::Card { payload } = format {
            if !payload.is_object() {
                return Err(ErrorEnvelope::expected(ErrorCode::validation(), "card payload must be a JSON object"));
            }
        }
        Ok(())
    }
}
