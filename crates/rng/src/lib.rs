//! Checkpointable random distributions.
//!
//! A distribution turns uniform draws from a [SimRng] into samples.  Distributions either own their source or borrow a
//! [SharedSource] the caller keeps.  Any set of distributions can be written into a checkpoint with a
//! [CheckpointWriter] and brought back with a [DistributionRegistry]; restored distributions continue their sample
//! streams exactly where they stopped.
mod checkpoint;
mod config;
mod constant;
mod distribution;
mod errors;
mod exponential;
mod poisson;
mod registry;
mod source;

pub use checkpoint::*;
pub use config::*;
pub use constant::*;
pub use distribution::*;
pub use errors::*;
pub use exponential::*;
pub use poisson::*;
pub use registry::*;
pub use source::*;
