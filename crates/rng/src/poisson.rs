//! Poisson-distributed counts, e.g. the number of arrivals in one interval.
use log::*;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointReader, CheckpointWriter, SourceImage};
use crate::distribution::*;
use crate::errors::*;
use crate::source::*;

/// A Poisson distribution with a fixed rate.
///
/// Samples are drawn with Knuth's product-of-uniforms method, so for a given source stream the sample stream is
/// exactly reproducible.  Expect roughly `lambda + 1` uniform draws per sample.  For very large `lambda`, `e^-lambda`
/// underflows and sampling degenerates to running until the product underflows to zero; that is accepted rather than
/// special-cased.
#[derive(Debug)]
pub struct PoissonDistribution {
    lambda: f64,
    source: SourceHandle,
}

#[derive(Serialize, Deserialize)]
struct PoissonState {
    lambda: f64,
    source: SourceImage,
}

impl PoissonDistribution {
    pub const TAG: &'static str = "poisson";

    /// A distribution with its own freshly seeded source.
    pub fn new(lambda: f64) -> Result<PoissonDistribution> {
        Self::with_source(lambda, SimRng::from_entropy())
    }

    /// A distribution which takes ownership of the given source.
    pub fn with_source(lambda: f64, source: SimRng) -> Result<PoissonDistribution> {
        Ok(PoissonDistribution {
            lambda: validate_rate("lambda", lambda)?,
            source: SourceHandle::Owned(source),
        })
    }

    /// A distribution which draws from a source the caller keeps ownership of.
    pub fn with_shared_source(lambda: f64, source: SharedSource) -> Result<PoissonDistribution> {
        Ok(PoissonDistribution {
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

    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    pub(crate) fn restore(
        state: &[u8],
        reader: &mut CheckpointReader,
    ) -> Result<Distribution, CheckpointError> {
        let state: PoissonState = bincode::deserialize(state)?;
        let lambda = validate_rate("lambda", state.lambda)?;
        let source = reader.restore_source(state.source)?;
        debug!(
            "Restored poisson distribution with lambda={} owns_source={}",
            lambda,
            source.owns_source()
        );
        Ok(PoissonDistribution { lambda, source }.into())
    }
}

impl RandomDistribution for PoissonDistribution {
    fn next_sample(&mut self) -> f64 {
        let limit = (-self.lambda).exp();
        self.source.with(|rng| {
            let mut p = 1.0;
            let mut k: u64 = 0;
            loop {
                k += 1;
                p *= rng.next_uniform();
                if p <= limit {
                    break;
                }
            }
            (k - 1) as f64
        })
    }

    fn type_tag(&self) -> &'static str {
        Self::TAG
    }

    fn save(&self, writer: &mut CheckpointWriter) -> Result<Vec<u8>, CheckpointError> {
        let state = PoissonState {
            lambda: self.lambda,
            source: writer.source_image(&self.source),
        };
        Ok(bincode::serialize(&state)?)
    }
}
