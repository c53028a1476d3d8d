//! JSON Schema export for the NotifyHub config, for operator tooling that
//! wants to validate a config file before loading it.

use crate::schema::NotifyHubConfig;
use schemars::schema::RootSchema;
use schemars::schema_for;

/// JSON Schema for [`NotifyHubConfig`].
#[must_use]
pub fn notifyhub_config_schema() -> RootSchema {
    schema_for!(NotifyHubConfig)
}
