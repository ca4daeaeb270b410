//! The distribution capability and the closed set of distributions the engine knows about.
use crate::checkpoint::CheckpointWriter;
use crate::constant::ConstantDistribution;
use crate::errors::*;
use crate::exponential::ExponentialDistribution;
use crate::poisson::PoissonDistribution;

/// A source of samples which can be written into a checkpoint.
///
/// Distributions are not meant to be sampled from several threads at once.  Use one per thread, or share a
/// [crate::SharedSource] between them.
#[enum_dispatch::enum_dispatch(Distribution)]
pub trait RandomDistribution {
    fn next_sample(&mut self) -> f64;

    /// Stable tag identifying the kind of distribution in a checkpoint.  Never change one once checkpoints exist.
    fn type_tag(&self) -> &'static str;

    /// Encode this distribution's state.  Sources go through `writer` so that shared ones are only saved once.
    fn save(&self, writer: &mut CheckpointWriter) -> Result<Vec<u8>, CheckpointError>;
}

#[enum_dispatch::enum_dispatch]
#[derive(Debug)]
pub enum Distribution {
    Poisson(PoissonDistribution),
    Exponential(ExponentialDistribution),
    Constant(ConstantDistribution),
}

/// Check that a rate parameter is usable.
pub(crate) fn validate_rate(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DistributionError::InvalidParameter { name, value })
    }
}
