pub mod core;
pub mod engine;
pub mod user;

pub use self::core::{
    inspect_bootstrap, marker_document, orchestrate_bootstrap, orchestrate_inspect,
    run_bootstrap, sanitize_db_url, BootstrapReport, BootstrapStatus,
};
pub use engine::{BootstrapEngine, InMemoryEngine, MongoEngine};
pub use user::{Action, AppUser, BuiltinRole, RoleGrant};
