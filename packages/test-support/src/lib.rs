//! Test support utilities
//!
//! Unified logging initialization and unique-name helpers shared by the
//! integration tests of the workspace.

pub mod logging;
pub mod unique_helpers;
