//! Exponentially distributed intervals: the time between arrivals of a Poisson process.
use log::*;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointReader, CheckpointWriter, SourceImage};
use crate::distribution::*;
use crate::errors::*;
use crate::source::*;

#[derive(Debug)]
pub struct ExponentialDistribution {
    lambda: f64,
    source: SourceHandle,
}

#[derive(Serialize, Deserialize)]
struct ExponentialState {
    lambda: f64,
    source: SourceImage,
}

impl ExponentialDistribution {
    pub const TAG: &'static str = "exponential";

    pub fn new(lambda: f64) -> Result<ExponentialDistribution> {
        Self::with_source(lambda, SimRng::from_entropy())
    }

    pub fn with_source(lambda: f64, source: SimRng) -> Result<ExponentialDistribution> {
        Ok(ExponentialDistribution {
            lambda: validate_rate("lambda", lambda)?,
            source: SourceHandle::Owned(source),
        })
    }

    pub fn with_shared_source(lambda: f64, source: SharedSource) -> Result<ExponentialDistribution> {
        Ok(ExponentialDistribution {
            lambda: validate_rate("lambda", lambda)?,
            source: SourceHandle::Shared(source),
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn owns_source(&self) -> bool {
        self.source.owns_source()
    }

    pub(crate) fn restore(
        state: &[u8],
        reader: &mut CheckpointReader,
    ) -> Result<Distribution, CheckpointError> {
        let state: ExponentialState = bincode::deserialize(state)?;
        let lambda = validate_rate("lambda", state.lambda)?;
        let source = reader.restore_source(state.source)?;
        debug!("Restored exponential distribution with lambda={}", lambda);
        Ok(ExponentialDistribution { lambda, source }.into())
    }
}

impl RandomDistribution for ExponentialDistribution {
    fn next_sample(&mut self) -> f64 {
        // Draws are in [0, 1), so 1 - u is never 0.
        let u = self.source.with(|rng| rng.next_uniform());
        -(1.0 - u).ln() / self.lambda
    }

    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn save(&self, writer: &mut CheckpointWriter) -> Result<Vec<u8>, CheckpointError> {
        let state = ExponentialState {
            lambda: self.lambda,
            source: writer.source_image(&self.source),
        };
        Ok(bincode::serialize(&state)?)
    }
}
