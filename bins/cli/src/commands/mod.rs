//! CLI command handlers.

pub mod config;
pub mod health;
pub mod info;
pub mod schedule;
pub mod schedule_batch;
pub mod self_check;
pub mod send;
pub mod support;
pub mod validate;

pub use config::{run_config_schema, run_config_show};
pub use health::run_health;
pub use info::run_info;
pub use schedule::run_schedule;
pub use schedule_batch::run_schedule_batch;
pub use self_check::run_self_check;
pub use send::run_send;
pub use validate::run_validate;
