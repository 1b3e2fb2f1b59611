pub mod actions;
pub mod capture;
pub mod common;
pub mod config;
pub mod error;
pub mod patrol;
pub mod state_machine;

pub use crate::common::WaypointGoal;
pub use crate::config::PatrolConfig;
pub use crate::error::PatrolError;
pub use crate::patrol::{CardboardPatrol, PatrolClients};
pub use crate::state_machine::Outcome;

/// Initialize terminal logging, `info` unless `RUST_LOG` says otherwise
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
