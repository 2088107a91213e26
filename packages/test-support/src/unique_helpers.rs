//! Helpers for generating unique database and user names
//!
//! Live tests share one MongoDB deployment, so every test works in its own
//! database to stay isolated across runs.

use ulid::Ulid;

/// Generate a unique database name with the given prefix
///
/// # Returns
/// A name in the format `{prefix}_{ulid}` with the ULID lowercased, well under
/// MongoDB's 64-byte database name limit for short prefixes.
///
/// # Examples
/// ```
/// use test_support::unique_helpers::unique_db_name;
///
/// let a = unique_db_name("bootstrap");
/// let b = unique_db_name("bootstrap");
/// assert_ne!(a, b);
/// assert!(a.starts_with("bootstrap_"));
/// ```
pub fn unique_db_name(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
}

/// Generate a unique user name with the given prefix
///
/// # Examples
/// ```
/// use test_support::unique_helpers::unique_user;
///
/// let user = unique_user("svc");
/// assert!(user.starts_with("svc-"));
/// ```
pub fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}
