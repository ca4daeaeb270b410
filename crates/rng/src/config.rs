//! Random source configuration.
use serde::{Deserialize, Serialize};

use crate::source::SimRng;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[serde(default)]
pub struct RngConfig {
    /// Seed for sources created from this config.  Without one, sources are seeded from the operating system and runs
    /// are not reproducible.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
}

impl RngConfig {
    pub fn from_json(text: &str) -> Result<RngConfig, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build a fresh source according to this config.
    pub fn make_source(&self) -> SimRng {
        match self.seed {
            Some(seed) => SimRng::seed_from_u64(seed),
            None => {
                log::warn!("No random seed configured; this run will not be reproducible");
                SimRng::from_entropy()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_seeded() {
        let config = RngConfigBuilder::default().seed(12).build().unwrap();
        assert_eq!(config, RngConfig::from_json(r#"{"seed": 12}"#).unwrap());
        assert_eq!(config.make_source(), SimRng::seed_from_u64(12));
    }

    #[test]
    fn test_default_is_unseeded() {
        assert_eq!(RngConfig::from_json("{}").unwrap().seed, None);
        assert_eq!(RngConfigBuilder::default().build().unwrap(), RngConfig::default());
    }
}
