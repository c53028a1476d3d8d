//! JSON Schema exports for API v1 request DTOs.

use crate::v1::ApiV1MessageRequestDto;
use schemars::schema::RootSchema;
use schemars::schema_for;

/// JSON Schema for `ApiV1MessageRequestDto`.
#[must_use]
pub fn api_v1_message_request_schema() -> RootSchema {
    schema_for!(ApiV1MessageRequestDto)
}
