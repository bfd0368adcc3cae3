//! Error types for the edit crate.

/// Errors that can occur while applying an edit batch.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The value layer rejected the batch or failed while rebuilding.
    #[error("value error: {0}")]
    Value(#[from] tessera_values::ValueError),
}

/// Convenience alias for edit results.
pub type EditResult<T> = Result<T, EditError>;
