//! Maps checkpoint type tags back to the code that rebuilds each kind of distribution.
use std::collections::HashMap;

use log::*;

use crate::checkpoint::CheckpointReader;
use crate::constant::ConstantDistribution;
use crate::distribution::Distribution;
use crate::errors::CheckpointError;
use crate::exponential::ExponentialDistribution;
use crate::poisson::PoissonDistribution;

/// Rebuild a distribution from its saved state.
pub type RestoreFn = fn(&[u8], &mut CheckpointReader) -> Result<Distribution, CheckpointError>;

#[derive(Default)]
pub struct DistributionRegistry {
    restorers: HashMap<&'static str, RestoreFn>,
}

impl std::fmt::Debug for DistributionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags = self.restorers.keys().collect::<Vec<_>>();
        tags.sort_unstable();
        f.debug_struct("DistributionRegistry")
            .field("tags", &tags)
            .finish()
    }
}

impl DistributionRegistry {
    /// A registry which knows nothing.
    pub fn new() -> DistributionRegistry {
        Default::default()
    }

    /// A registry which can restore every distribution in this crate.
    pub fn with_builtins() -> DistributionRegistry {
        let mut reg = DistributionRegistry::new();
        reg.register(PoissonDistribution::TAG, PoissonDistribution::restore);
        reg.register(ExponentialDistribution::TAG, ExponentialDistribution::restore);
        reg.register(ConstantDistribution::TAG, ConstantDistribution::restore);
        reg
    }

    /// Register a restore function, returning whatever was previously registered under the tag.
    pub fn register(&mut self, tag: &'static str, restore: RestoreFn) -> Option<RestoreFn> {
        self.restorers.insert(tag, restore)
    }

    pub fn restore(
        &self,
        tag: &str,
        state: &[u8],
        reader: &mut CheckpointReader,
    ) -> Result<Distribution, CheckpointError> {
        let restore = self
            .restorers
            .get(tag)
            .ok_or_else(|| CheckpointError::UnknownTag(tag.to_string()))?;
        restore(state, reader)
    }

    /// Restore every distribution in the checkpoint, in the order they were written.
    ///
    /// On success the reader is drained.  On failure it keeps every record, so the caller can register the missing
    /// restorer and try again; shared sources already rebuilt are reused by the retry.
    pub fn restore_all(
        &self,
        reader: &mut CheckpointReader,
    ) -> Result<Vec<Distribution>, CheckpointError> {
        let records = reader.take_records();
        debug!("Restoring {} distributions from checkpoint", records.len());
        let restored = records
            .iter()
            .map(|r| self.restore(&r.tag, &r.state, reader))
            .collect::<Result<Vec<_>, _>>();
        if restored.is_err() {
            reader.put_back_records(records);
        }
        restored
    }
}
