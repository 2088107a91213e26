//! Shared MongoDB bootstrap configuration and first-start orchestration.
//! Used by the `mongo-init` CLI and the integration tests.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db;
pub use error::{BootstrapStep, DbInfraError};
pub use infra::db::core::{
    inspect_bootstrap, orchestrate_bootstrap, orchestrate_inspect, run_bootstrap,
};
