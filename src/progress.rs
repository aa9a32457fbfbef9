//! Progress Tracker rules.
//!
//! A progress row moves `not-started -> in-progress -> completed` as the client
//! reports larger values. Lower values are accepted and un-complete the row.

use crate::error::AppError;

/// Fraction at or above which a row counts as completed.
pub const COMPLETION_THRESHOLD: f64 = 0.9;

/// Articles complete on first view.
pub const ARTICLE_VIEW_PROGRESS: f64 = 1.0;

pub fn is_completed(progress: f64) -> bool {
    progress >= COMPLETION_THRESHOLD
}

/// validate_progress
///
/// Accepts any finite value in `[0.0, 1.0]`.
pub fn validate_progress(progress: f64) -> Result<f64, AppError> {
    if !progress.is_finite() || !(0.0..=1.0).contains(&progress) {
        return Err(AppError::validation(
            "progress must be a number between 0.0 and 1.0",
        ));
    }
    Ok(progress)
}
