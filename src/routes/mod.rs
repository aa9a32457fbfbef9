//! Router Module Index
//!
//! Splits the routing table by the level of access each group requires, so the
//! access check for a group is visible where the group is assembled.

/// Routes accessible without credentials (health check only).
pub mod public;

/// Routes behind the `AuthUser` extractor middleware: content reads and the
/// caller's own progress.
pub mod authenticated;

/// Routes nested under `/admin`. Every handler checks the admin flag itself.
pub mod admin;
