//! Error types for circle management operations.
//!
//! The reconciler itself never fails; these errors come from the store
//! and from validating user actions (rename, archive, invitations).

use thiserror::Error;

use crate::store::StoreError;

/// Error type for circle operations.
#[derive(Error, Debug)]
pub enum CircleError {
    /// Underlying row store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Circle not found.
    #[error("Circle not found: {0}")]
    NotFound(String),

    /// Invitation not found.
    #[error("Invitation not found: {0}")]
    InviteNotFound(String),

    /// Journal entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Invalid data provided.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Row already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Membership or invitation state conflict.
    #[error("Membership conflict: {0}")]
    MembershipConflict(String),
}

/// Result type alias for circle operations.
pub type Result<T> = std::result::Result<T, CircleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = CircleError::from(StoreError::Storage("lock poisoned".to_string()));
        assert_eq!(err.to_string(), "Store error: Storage error: lock poisoned");
    }

    #[test]
    fn not_found_error_display() {
        let err = CircleError::NotFound("c42".to_string());
        assert_eq!(err.to_string(), "Circle not found: c42");
    }

    #[test]
    fn invite_not_found_error_display() {
        let err = CircleError::InviteNotFound("conn1".to_string());
        assert_eq!(err.to_string(), "Invitation not found: conn1");
    }

    #[test]
    fn entry_not_found_error_display() {
        let err = CircleError::EntryNotFound("e1".to_string());
        assert_eq!(err.to_string(), "Entry not found: e1");
    }

    #[test]
    fn invalid_data_error_display() {
        let err = CircleError::InvalidData("bad colour".to_string());
        assert_eq!(err.to_string(), "Invalid data: bad colour");
    }

    #[test]
    fn already_exists_error_display() {
        let err = CircleError::AlreadyExists("member u2".to_string());
        assert_eq!(err.to_string(), "Already exists: member u2");
    }

    #[test]
    fn membership_conflict_error_display() {
        let err = CircleError::MembershipConflict("already connected".to_string());
        assert_eq!(err.to_string(), "Membership conflict: already connected");
    }
}
