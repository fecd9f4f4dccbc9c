pub mod clap;
pub mod config;
pub mod ledger_scope;
pub mod log_level_wrapper;
pub mod rolling_appender_rotation;
pub mod secret_string;

pub use crate::clap::CLAP_ARGS;
pub use crate::config::AppConfig;
