//! Checkpoint images for distributions.
//!
//! An image is a table of shared sources plus one record per distribution, each record being a type tag and the
//! distribution's own encoded state.  The whole image is encoded with bincode.
//!
//! Sources are where the care goes.  An owned source is saved inline with its distribution.  A shared source is saved
//! once in the table no matter how many distributions borrow it, and each borrower saves the table index.  On restore
//! every index is materialized exactly once, so distributions that shared a source before the checkpoint share one
//! after it and their combined draw sequence continues unchanged.
use std::sync::{Arc, PoisonError};

use serde::{Deserialize, Serialize};

use crate::distribution::RandomDistribution;
use crate::errors::CheckpointError;
use crate::source::*;

/// How a distribution's source appears in its saved state.
#[derive(Debug, Serialize, Deserialize)]
pub enum SourceImage {
    Owned(SimRng),
    /// Index into the image's shared source table.
    Shared(u32),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DistributionRecord {
    pub(crate) tag: String,
    pub(crate) state: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointImage {
    shared_sources: Vec<SimRng>,
    distributions: Vec<DistributionRecord>,
}

/// Collects distributions into a checkpoint image.
///
/// Sources are snapshotted at the moment the distribution using them is written, so write everything before drawing
/// again.
#[derive(Debug, Default)]
pub struct CheckpointWriter {
    image: CheckpointImage,
    /// Parallel to `image.shared_sources`, for identity lookups.
    shared: Vec<SharedSource>,
}

impl CheckpointWriter {
    pub fn new() -> CheckpointWriter {
        Default::default()
    }

    /// Record a source, returning what the distribution should save in its place.
    pub fn source_image(&mut self, source: &SourceHandle) -> SourceImage {
        match source {
            SourceHandle::Owned(rng) => SourceImage::Owned(rng.clone()),
            SourceHandle::Shared(shared) => {
                let index = match self.shared.iter().position(|s| Arc::ptr_eq(s, shared)) {
                    Some(i) => i,
                    None => {
                        let state = shared
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .clone();
                        self.image.shared_sources.push(state);
                        self.shared.push(shared.clone());
                        self.shared.len() - 1
                    }
                };
                SourceImage::Shared(index as u32)
            }
        }
    }

    /// Add a distribution to the image.
    pub fn write(&mut self, distribution: &impl RandomDistribution) -> Result<(), CheckpointError> {
        let state = distribution.save(self)?;
        self.image.distributions.push(DistributionRecord {
            tag: distribution.type_tag().to_string(),
            state,
        });
        Ok(())
    }

    /// Number of distinct shared sources written so far.
    pub fn shared_source_count(&self) -> usize {
        self.shared.len()
    }

    /// Encode the image.
    pub fn finish(self) -> Result<Vec<u8>, CheckpointError> {
        log::debug!(
            "Writing checkpoint with {} distributions and {} shared sources",
            self.image.distributions.len(),
            self.image.shared_sources.len()
        );
        Ok(bincode::serialize(&self.image)?)
    }
}

/// Reads a checkpoint image back.  Pair with [crate::DistributionRegistry::restore_all].
#[derive(Debug)]
pub struct CheckpointReader {
    saved_sources: Vec<SimRng>,
    restored_sources: Vec<Option<SharedSource>>,
    records: Vec<DistributionRecord>,
}

impl CheckpointReader {
    pub fn from_bytes(bytes: &[u8]) -> Result<CheckpointReader, CheckpointError> {
        let image: CheckpointImage = bincode::deserialize(bytes)?;
        let restored_sources = vec![None; image.shared_sources.len()];
        Ok(CheckpointReader {
            saved_sources: image.shared_sources,
            restored_sources,
            records: image.distributions,
        })
    }

    /// The shared source at `index`, built on first request and handed out again afterward.
    pub fn shared_source(&mut self, index: u32) -> Result<SharedSource, CheckpointError> {
        let available = self.saved_sources.len();
        let i = index as usize;
        let (slot, saved) = match (self.restored_sources.get_mut(i), self.saved_sources.get(i)) {
            (Some(slot), Some(saved)) => (slot, saved),
            _ => return Err(CheckpointError::MissingSource { index, available }),
        };
        Ok(slot.get_or_insert_with(|| share(saved.clone())).clone())
    }

    /// Turn a saved source back into something a distribution can draw from.
    pub fn restore_source(&mut self, image: SourceImage) -> Result<SourceHandle, CheckpointError> {
        match image {
            SourceImage::Owned(rng) => Ok(SourceHandle::Owned(rng)),
            SourceImage::Shared(index) => Ok(SourceHandle::Shared(self.shared_source(index)?)),
        }
    }

    /// Number of distributions in the image.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn take_records(&mut self) -> Vec<DistributionRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn put_back_records(&mut self, records: Vec<DistributionRecord>) {
        self.records = records;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::*;

    #[test]
    fn test_shared_sources_written_once() -> Result<(), CheckpointError> {
        let shared = share(SimRng::seed_from_u64(1));
        let a = PoissonDistribution::with_shared_source(1.0, shared.clone())?;
        let b = ExponentialDistribution::with_shared_source(2.0, shared)?;
        let c = PoissonDistribution::with_source(1.0, SimRng::seed_from_u64(2))?;

        let mut writer = CheckpointWriter::new();
        writer.write(&a)?;
        writer.write(&b)?;
        writer.write(&c)?;
        assert_eq!(writer.shared_source_count(), 1);

        let reader = CheckpointReader::from_bytes(&writer.finish()?)?;
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.saved_sources.len(), 1);
        Ok(())
    }

    #[test]
    fn test_shared_source_restored_once() -> Result<(), CheckpointError> {
        let mut writer = CheckpointWriter::new();
        writer.source_image(&SourceHandle::Shared(share(SimRng::seed_from_u64(3))));
        let mut reader = CheckpointReader::from_bytes(&writer.finish()?)?;

        let first = reader.shared_source(0)?;
        let second = reader.shared_source(0)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first.lock().unwrap(), SimRng::seed_from_u64(3));

        assert!(matches!(
            reader.shared_source(1),
            Err(CheckpointError::MissingSource {
                index: 1,
                available: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            CheckpointReader::from_bytes(&[0xff, 0x01]),
            Err(CheckpointError::Encoding(_))
        ));
    }
}
