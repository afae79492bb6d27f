//! Security gate for dirflow: every command a model proposes passes through
//! here before anything can execute it.
//!
//! Provides:
//! - **Path rules**: denylist of traversal and system-directory patterns,
//!   workspace-root awareness
//! - **Command validation**: allow-listed actions, per-action required
//!   fields, batch limits, search option checks, deletion guards

pub mod error;
pub mod path;
pub mod validator;

pub use error::ValidationError;
pub use path::{PathRules, PathVerdict};
pub use validator::{BatchError, BatchReport, CommandValidator, SearchValidationStats, ValidatorStats};
