//! Access Policy.
//!
//! Checks run in a fixed order for every operation:
//! 1. authentication, enforced by the `AuthUser` extractor (401);
//! 2. for content reads, unpublished items are hidden from non-admins (404);
//! 3. for writes, deletes and admin listings, the caller must be an admin (403).

use crate::{auth::AuthUser, error::AppError};

/// Visibility
///
/// Which content a read may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only `is_published = true` rows.
    PublishedOnly,
    /// Every row, published or not.
    All,
}

impl Visibility {
    pub fn includes_unpublished(self) -> bool {
        matches!(self, Visibility::All)
    }

    /// Whether a row with the given publication flag is visible.
    pub fn admits(self, is_published: bool) -> bool {
        is_published || self.includes_unpublished()
    }
}

/// Admins read everything; everyone else only sees published content.
pub fn read_visibility(user: &AuthUser) -> Visibility {
    if user.is_admin {
        Visibility::All
    } else {
        Visibility::PublishedOnly
    }
}

/// require_admin
///
/// Gate for every mutating and admin-listing operation. Runs before any lookup so a
/// non-admin gets 403 whether or not the target exists.
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, "admin-only operation attempted by non-admin");
        Err(AppError::Forbidden)
    }
}
