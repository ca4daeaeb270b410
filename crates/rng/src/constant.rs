//! A "distribution" which always returns the same value, for deterministic workloads and tests.
use crate::checkpoint::{CheckpointReader, CheckpointWriter};
use crate::distribution::*;
use crate::errors::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDistribution {
    value: f64,
}

impl ConstantDistribution {
    pub const TAG: &'static str = "constant";

    /// Fails if `value` is NaN or infinite.
    pub fn new(value: f64) -> Result<ConstantDistribution> {
        if !value.is_finite() {
            return Err(DistributionError::InvalidParameter {
                name: "value",
                value,
            });
        }
        Ok(ConstantDistribution { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn restore(
        state: &[u8],
        _reader: &mut CheckpointReader,
    ) -> Result<Distribution, CheckpointError> {
        let value: f64 = bincode::deserialize(state)?;
        Ok(ConstantDistribution::new(value)?.into())
    }
}

impl RandomDistribution for ConstantDistribution {
    fn next_sample(&mut self) -> f64 {
        self.value
    }

    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn save(&self, _writer: &mut CheckpointWriter) -> Result<Vec<u8>, CheckpointError> {
        Ok(bincode::serialize(&self.value)?)
    }
}
