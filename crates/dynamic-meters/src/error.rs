use thiserror::Error;

/// Result type for dynamic meter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dynamic meter operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The number of tag values did not match the number of declared tag keys.
    #[error("expected {expected} tag values, got {actual}, keys: {keys:?}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        keys: Vec<String>,
    },

    /// A builder, customizer, tagger or registrar failed.
    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
}
