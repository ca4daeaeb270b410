#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DistributionError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CheckpointError {
    #[error("Could not encode or decode checkpoint data: {}", _0)]
    Encoding(#[from] bincode::Error),

    #[error("No distribution is registered for tag {0:?}")]
    UnknownTag(String),

    #[error("Checkpoint refers to shared source {index} but only {available} were saved")]
    MissingSource { index: u32, available: usize },

    #[error("Restored distribution is invalid: {}", _0)]
    Distribution(#[from] DistributionError),
}

pub type Result<T, E = DistributionError> = std::result::Result<T, E>;
