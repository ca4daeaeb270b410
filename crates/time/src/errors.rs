#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QuantityError {
    #[error("Could not parse {0:?} as a quantity")]
    Malformed(String),

    #[error("Attempted to divide by a zero quantity")]
    DivisionByZero,
}

/// Conditions under which the time authority cannot hand out a converter.
///
/// All of these are fatal to a simulation: a missing or wrong time base corrupts every scheduling decision made
/// afterwards.  They are returned rather than aborting so that the host engine can report them with its own context.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TimeError {
    #[error("Time authority has not yet been initialized")]
    Uninitialized,

    #[error("Time converter creation requires a time unit (s or Hz), {0} was passed")]
    UnsupportedUnit(String),

    #[error("Attempting to get a time converter for a time ({requested}) which cannot be expressed with the time base ({time_base})")]
    ResolutionOverflow {
        requested: String,
        time_base: String,
    },

    #[error("Time converter creation requires a positive quantity, {0} was passed")]
    NonPositive(String),

    #[error("Quantity error: {}", _0)]
    Quantity(#[from] QuantityError),
}

pub type Result<T, E = TimeError> = std::result::Result<T, E>;
