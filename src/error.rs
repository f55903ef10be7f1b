use thiserror::Error;

/// Failure values surfaced by the engine. None of them are retried
/// internally, and non-convergence is not one of them: a training run that
/// hits its epoch limit reports that through its outcome instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A pattern or target vector has the wrong length for its consumer.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// An attached data set does not fit the network topology.
    #[error("data set does not match the network topology: {0}")]
    ShapeMismatch(String),

    /// A quota or hyperparameter is outside its valid domain.
    #[error("value out of range: {0}")]
    Range(String),

    /// A persisted weight or training-data file is malformed.
    #[error("malformed file: {0}")]
    Format(String),

    /// The underlying file system failed.
    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),

    /// Training was requested on a network without an attached data set.
    #[error("no training data set is attached to the network")]
    NotAttached,
}
