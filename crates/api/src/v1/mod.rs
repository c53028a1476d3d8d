//! API v1 DTOs and helpers.

mod mappers;
mod schema;
mod types;
mod validation;

pub use mappers::{
    batch_handle_to_api_v1, error_code_to_api_v1, error_envelope_to_api_v1_error, executor_stats_to_api_v1, handle_snapshot_to_api_v1,
    message_request_to_domain, receipt_to_api_v1, result_to_api_v1_result, target_dto_to_domain,
};
pub use schema::api_v1_message_request_schema;
pub use types::*;
pub use validation::{ApiV1ValidationIssue, validate_message_request};
