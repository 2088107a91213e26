//! Tracing setup for bootstrap tests.
//!
//! Bootstrap runs log `bootstrap=start` / `bootstrap=done` at info level from
//! `db_infra`; those lines stay visible in failing test output while the
//! driver's own chatter is held back.

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

/// Filter applied when neither `TEST_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_TEST_FILTER: &str = "warn,db_infra=info,mongodb=error";

// Whether this call site installed the global subscriber.
static SUBSCRIBER: Lazy<bool> = Lazy::new(|| {
    let directives = filter_directives(|name| std::env::var(name).ok());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_test_writer()
        .without_time()
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
});

/// Install the test subscriber once per process. Safe to call from every test.
pub fn init() {
    Lazy::force(&SUBSCRIBER);
}

/// True when `init` installed the subscriber; false when another one was
/// already registered for this process.
pub fn installed() -> bool {
    *SUBSCRIBER
}

/// `TEST_LOG` overrides `RUST_LOG`, which overrides [`DEFAULT_TEST_FILTER`].
pub fn filter_directives<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("TEST_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_TEST_FILTER.to_string())
}
