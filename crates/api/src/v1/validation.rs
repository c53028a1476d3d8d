//! API v1 DTO validation helpers (shape and limit checks only).

use crate::v1::ApiV1MessageRequestDto;
use notifyhub_shared::{Validate, ValidationError};
use std::fmt;

/// Validation failure details for API v1 DTOs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiV1ValidationIssue {
    /// Field name that failed validation.
    pub field: &'static str,
    /// Human-readable validation error message.
    pub message: Box<str>,
}

impl ApiV1ValidationIssue {
    fn new(field: &'static str, message: impl Into<Box<str>>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiV1ValidationIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ApiV1ValidationIssue {}

impl ValidationError for ApiV1ValidationIssue {
    fn empty(field: &'static str) -> Self {
        Self::new(field, "value must be non-empty")
    }

    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::new(field, reason)
    }

    fn out_of_range(field: &'static str, _value: String, min: String, max: String) -> Self {
        Self::new(field, format!("value must be between {min} and {max}"))
    }
}

const MIN_TARGETS: usize = 1;
const MAX_TARGETS: usize = 100;
const MAX_TITLE_CHARS: usize = 200;
const MAX_BODY_CHARS: usize = 4096;

/// Validate a message request DTO: scalar field checks via the derived
/// [`Validate`] impl, plus the length/count limits the derive macro can't
/// express (title/body char counts, target-count range, card payload shape).
pub fn validate_message_request(
    dto: &ApiV1MessageRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()?;

    if dto.title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiV1ValidationIssue::out_of_range(
            "title",
            dto.title.chars().count().to_string(),
            "1".to_string(),
            MAX_TITLE_CHARS.to_string(),
        ));
    }
    if dto.body.chars().count() > MAX_BODY_CHARS {
        return Err(ApiV1ValidationIssue::out_of_range(
            "body",
            dto.body.chars().count().to_string(),
            "1".to_string(),
            MAX_BODY_CHARS.to_string(),
        ));
    }
    if dto.targets.len() < MIN_TARGETS || dto.targets.len() > MAX_TARGETS {
        return Err(ApiV1ValidationIssue::out_of_range(
            "targets",
            dto.targets.len().to_string(),
            MIN_TARGETS.to_string(),
            MAX_TARGETS.to_string(),
        ));
    }
    for target in &dto.targets {
        target.validate()?;
    }
    if let crate::v1::ApiV1MessageFormat::Card { payload } = &dto.format {
        if !payload.is_object() {
            return Err(ApiV1ValidationIssue::invalid(
                "format",
                "card payload must be a JSON object",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::{ApiV1MessageFormat, ApiV1Priority, ApiV1TargetDto};
    use std::collections::BTreeMap;

    fn valid_target() -> ApiV1TargetDto {
        ApiV1TargetDto {
            target_type: "email".to_string(),
            value: "a@example.com".to_string(),
            platform: "smtp".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn base_request() -> ApiV1MessageRequestDto {
        ApiV1MessageRequestDto {
            title: "hi".to_string(),
            body: "there".to_string(),
            format: ApiV1MessageFormat::Text,
            priority: ApiV1Priority::Normal,
            targets: vec![valid_target()],
            variables: BTreeMap::new(),
            metadata: BTreeMap::new(),
            platform_data: BTreeMap::new(),
            scheduled_at: None,
        }
    }

    #[test]
    fn accepts_minimal_valid_request() {
        assert!(validate_message_request(&base_request()).is_ok());
    }

    #[test]
    fn rejects_empty_title() {
        let mut request = base_request();
        request.title = String::new();
        assert!(validate_message_request(&request).is_err());
    }

    #[test]
    fn rejects_no_targets() {
        let mut request = base_request();
        request.targets.clear();
        assert!(validate_message_request(&request).is_err());
    }

    #[test]
    fn rejects_too_many_targets() {
        let mut request = base_request();
        request.targets = (0..MAX_TARGETS + 1).map(|_| valid_target()).collect();
        assert!(validate_message_request(&request).is_err());
    }

    #[test]
    fn rejects_non_object_card_payload() {
        let mut request = base_request();
        request.format = ApiV1MessageFormat::Card {
            payload: serde_json::json!([1, 2, 3]),
        };
        assert!(validate_message_request(&request).is_err());
    }
}
