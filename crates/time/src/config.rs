//! Time configuration for an engine rank.
use serde::{Deserialize, Serialize};

/// The time base used when nothing else is configured: one tick per picosecond.
pub const DEFAULT_TIME_BASE: &str = "1ps";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[serde(default)]
pub struct TimeConfig {
    /// The physical duration of one simulation tick, e.g. `"1ps"`.
    ///
    /// Every rank of a run must use the same value.
    #[builder(default = "DEFAULT_TIME_BASE.to_string()", setter(into))]
    pub timebase: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            timebase: DEFAULT_TIME_BASE.to_string(),
        }
    }
}

impl TimeConfig {
    /// Read the config from JSON.  Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<TimeConfig, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        assert_eq!(TimeConfig::default().timebase, "1ps");
        assert_eq!(TimeConfigBuilder::default().build().unwrap(), TimeConfig::default());
        assert_eq!(TimeConfig::from_json("{}").unwrap(), TimeConfig::default());
    }

    #[test]
    fn test_overrides() {
        let built = TimeConfigBuilder::default().timebase("1fs").build().unwrap();
        let parsed = TimeConfig::from_json(r#"{"timebase": "1fs"}"#).unwrap();
        assert_eq!(built, parsed);
        assert_eq!(parsed.timebase, "1fs");
    }
}
