use thiserror::Error;

/// Failures at the persistence boundary that callers need to tell apart.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A meal-plan write failed and the local view was restored.
    #[error("could not update {target}, change was rolled back: {reason}")]
    MutationRolledBack { target: String, reason: String },

    /// Some remote slots could not be cleared; the local list was kept.
    #[error(
        "{} of {attempted} planned meals could not be cleared, grocery list kept so the clear can be retried: {reason}",
        .failed.len()
    )]
    PartialClear {
        attempted: usize,
        failed: Vec<String>,
        reason: String,
    },

    /// Another writer kept moving the stored records ahead of this one.
    #[error("could not save {records} after {attempts} attempts, another writer kept changing it")]
    WriteConflict { records: String, attempts: usize },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether retrying the same action can succeed without user changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MutationRolledBack { .. }
                | Self::PartialClear { .. }
                | Self::WriteConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_clear_message() {
        let err = SyncError::PartialClear {
            attempted: 3,
            failed: vec!["2025-01-04_lunch".to_string()],
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "1 of 3 planned meals could not be cleared, grocery list kept so the clear can be retried: connection refused"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_storage_error_not_retryable() {
        let err = SyncError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "disk full");
        assert!(!err.is_retryable());
    }
}
