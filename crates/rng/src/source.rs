//! Uniform random sources.
//!
//! Distributions turn uniform draws into samples.  The draws come from a [SimRng], which is either owned by one
//! distribution or shared between several through a [SharedSource] that the caller keeps alive.
use std::sync::{Arc, Mutex, PoisonError};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Something that produces uniform draws.
pub trait UniformSource {
    /// A uniform draw from `[0, 1)`.
    fn next_uniform(&mut self) -> f64;

    fn next_u32(&mut self) -> u32;

    fn next_u64(&mut self) -> u64;
}

/// The engine's random source: a seeded ChaCha8 stream.
///
/// The whole generator state serializes, so a source written into a checkpoint resumes exactly where it stopped.  The
/// stream for a given seed is the same on every platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRng {
    rng: ChaCha8Rng,
}

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> SimRng {
        SimRng {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A source seeded from the operating system.  Not reproducible; use [SimRng::seed_from_u64] for that.
    pub fn from_entropy() -> SimRng {
        SimRng {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl UniformSource for SimRng {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_u32(&mut self) -> u32 {
        self.rng.gen()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// A source owned by the caller and borrowed by any number of distributions.
pub type SharedSource = Arc<Mutex<SimRng>>;

pub fn share(rng: SimRng) -> SharedSource {
    Arc::new(Mutex::new(rng))
}

/// The source a distribution draws from.
#[derive(Debug)]
pub enum SourceHandle {
    /// The distribution owns the source; it lives exactly as long as the distribution.
    Owned(SimRng),
    /// The caller owns the source and must keep using it only through the handle it already has.
    Shared(SharedSource),
}

impl SourceHandle {
    pub fn owns_source(&self) -> bool {
        matches!(self, SourceHandle::Owned(_))
    }

    pub fn shared(&self) -> Option<&SharedSource> {
        match self {
            SourceHandle::Shared(s) => Some(s),
            SourceHandle::Owned(_) => None,
        }
    }

    /// Run `f` against the underlying source.  Shared sources are locked once for the whole call.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut SimRng) -> R) -> R {
        match self {
            SourceHandle::Owned(rng) => f(rng),
            SourceHandle::Shared(shared) => {
                let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut guard)
            }
        }
    }
}
