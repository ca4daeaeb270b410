//! The time authority: owner of the time base and of every [TimeConverter].
//!
//! Anything that deals in physical time asks the authority for a converter, by text (`"2.5ns"`, `"100MHz"`), by
//! [Quantity], or by raw tick factor.  Converters are deduplicated twice:
//!
//! - by the exact text requested, so repeated lookups of the same string skip parsing entirely;
//! - by tick factor, so `"1us"` and `"1000ns"` under a `1ns` time base share one converter.
//!
//! The factor map is the real arena; the text map only memoizes parses into it.
//!
//! The authority is built once during start-up: [TimeAuthority::init] takes `&mut self`, so nothing can resolve
//! concurrently with it.  Afterward it is shared (usually in an `Arc`) and resolution takes `&self`, serialized by one
//! mutex around both caches.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::*;
use num::ToPrimitive;

use crate::config::TimeConfig;
use crate::converter::*;
use crate::errors::*;
use crate::quantity::Quantity;

struct TimeBase {
    text: String,
    quantity: Quantity,
    /// A shortcut the time base can't express holds the error it produced.
    nano: Result<Arc<TimeConverter>>,
    micro: Result<Arc<TimeConverter>>,
    milli: Result<Arc<TimeConverter>>,
}

#[derive(Default)]
struct Caches {
    by_text: HashMap<String, Arc<TimeConverter>>,
    by_factor: BTreeMap<SimTime, Arc<TimeConverter>>,
}

/// Log a fatal condition on its way out.
fn fatal(err: TimeError) -> TimeError {
    error!("{}", err);
    err
}

impl Caches {
    fn for_factor(&mut self, factor: SimTime) -> Arc<TimeConverter> {
        self.by_factor
            .entry(factor)
            .or_insert_with(|| {
                debug!("Creating time converter with factor {}", factor);
                Arc::new(TimeConverter::new(factor))
            })
            .clone()
    }

    fn for_quantity(&mut self, base: &Quantity, quantity: &Quantity) -> Result<Arc<TimeConverter>> {
        let ratio = if quantity.is_time() {
            if !quantity.is_positive() {
                return Err(TimeError::NonPositive(quantity.to_string()));
            }
            quantity.div(base)?
        } else if quantity.is_frequency() {
            if !quantity.is_positive() {
                return Err(TimeError::NonPositive(quantity.to_string()));
            }
            base.invert()?.div(quantity)?
        } else {
            return Err(TimeError::UnsupportedUnit(quantity.to_string()));
        };

        let overflow = || TimeError::ResolutionOverflow {
            requested: quantity.to_string(),
            time_base: base.to_string_best_si(),
        };

        // Zero ticks means the request is finer than the time base can express.
        let factor = ratio
            .rounded_value()
            .to_u64()
            .filter(|f| *f != 0)
            .ok_or_else(overflow)?;
        Ok(self.for_factor(factor))
    }

    fn for_text(&mut self, base: &Quantity, text: &str) -> Result<Arc<TimeConverter>> {
        if let Some(tc) = self.by_text.get(text) {
            return Ok(tc.clone());
        }

        let quantity = Quantity::parse(text)?;
        let tc = self.for_quantity(base, &quantity)?;
        // Keyed by what the caller wrote, not the canonical form of the quantity.
        self.by_text.insert(text.to_string(), tc.clone());
        Ok(tc)
    }
}

/// Owner of the time base and all time converters.
///
/// See the module documentation.
pub struct TimeAuthority {
    base: Option<TimeBase>,
    caches: Mutex<Caches>,
}

impl TimeAuthority {
    /// An authority with no time base.  Every resolution fails with [TimeError::Uninitialized] until
    /// [TimeAuthority::init] is called.
    pub fn new() -> TimeAuthority {
        TimeAuthority {
            base: None,
            caches: Mutex::new(Default::default()),
        }
    }

    /// Build an authority and initialize it with the given time base.
    pub fn with_time_base(time_base: &str) -> Result<TimeAuthority> {
        let mut authority = TimeAuthority::new();
        authority.init(time_base)?;
        Ok(authority)
    }

    pub fn from_config(config: &TimeConfig) -> Result<TimeAuthority> {
        Self::with_time_base(&config.timebase)
    }

    /// Set the time base.
    ///
    /// The ns/us/ms shortcuts are resolved here.  One the time base can't express (`1ns` under a `1us` base, say) is
    /// logged and reported by its accessor instead of failing initialization.
    ///
    /// This is meant to be called once.  Calling it again switches to the new time base and forgets previously parsed
    /// text, but converters already handed out stay alive and unchanged.
    pub fn init(&mut self, time_base: &str) -> Result<()> {
        let quantity = Quantity::parse(time_base).map_err(|e| fatal(e.into()))?;
        if !quantity.is_time() {
            return Err(fatal(TimeError::UnsupportedUnit(quantity.to_string())));
        }
        if !quantity.is_positive() {
            return Err(fatal(TimeError::NonPositive(quantity.to_string())));
        }

        let caches = self.caches.get_mut().unwrap_or_else(PoisonError::into_inner);
        if self.base.is_some() {
            warn!(
                "Time authority re-initialized with time base {}; parsed text is forgotten",
                time_base
            );
            caches.by_text.clear();
        }

        let mut shortcut = |text: &str| {
            let resolved = caches.for_text(&quantity, text);
            if let Err(e) = &resolved {
                warn!("No {} shortcut under this time base: {}", text, e);
            }
            resolved
        };
        let nano = shortcut("1ns");
        let micro = shortcut("1us");
        let milli = shortcut("1ms");

        info!("Time base set to {}", quantity.to_string_best_si());
        self.base = Some(TimeBase {
            text: time_base.to_string(),
            quantity,
            nano,
            micro,
            milli,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.base.is_some()
    }

    fn time_base_state(&self) -> Result<&TimeBase> {
        self.base
            .as_ref()
            .ok_or_else(|| fatal(TimeError::Uninitialized))
    }

    fn lock_caches(&self) -> MutexGuard<'_, Caches> {
        // The caches are insert-only, so a panic mid-insert can't leave them inconsistent.
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve text such as `"10ns"` or `"2GHz"` to a converter.
    ///
    /// Calling this twice with the same text returns the same converter.
    pub fn resolve_str(&self, text: &str) -> Result<Arc<TimeConverter>> {
        let base = self.time_base_state()?;
        self.lock_caches()
            .for_text(&base.quantity, text)
            .map_err(fatal)
    }

    /// Resolve a time or frequency.  A time resolves to `time / time_base` ticks, a frequency to its period in ticks.
    pub fn resolve_quantity(&self, quantity: &Quantity) -> Result<Arc<TimeConverter>> {
        let base = self.time_base_state()?;
        self.lock_caches()
            .for_quantity(&base.quantity, quantity)
            .map_err(fatal)
    }

    /// Get the converter for a raw tick factor.
    pub fn resolve_factor(&self, factor: SimTime) -> Result<Arc<TimeConverter>> {
        self.time_base_state()?;
        if factor == 0 {
            return Err(fatal(TimeError::NonPositive(factor.to_string())));
        }
        Ok(self.lock_caches().for_factor(factor))
    }

    /// The number of ticks in the given time.  Equivalent to `resolve_str(text)?.factor()`, with the same caching.
    pub fn sim_cycles(&self, text: &str) -> Result<SimTime> {
        Ok(self.resolve_str(text)?.factor())
    }

    pub fn time_base(&self) -> Result<&Quantity> {
        Ok(&self.time_base_state()?.quantity)
    }

    /// The time base exactly as it was passed to [TimeAuthority::init].
    pub fn time_base_string(&self) -> Result<&str> {
        Ok(&self.time_base_state()?.text)
    }

    pub fn nano(&self) -> Result<Arc<TimeConverter>> {
        self.time_base_state()?.nano.clone().map_err(fatal)
    }

    pub fn micro(&self) -> Result<Arc<TimeConverter>> {
        self.time_base_state()?.micro.clone().map_err(fatal)
    }

    pub fn milli(&self) -> Result<Arc<TimeConverter>> {
        self.time_base_state()?.milli.clone().map_err(fatal)
    }

    /// How many distinct converters (that is, distinct factors) this authority owns.
    pub fn converter_count(&self) -> usize {
        self.lock_caches().by_factor.len()
    }
}

impl Default for TimeAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimeAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeAuthority")
            .field("time_base", &self.base.as_ref().map(|b| b.text.as_str()))
            .field("converters", &self.converter_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn authority(base: &str) -> TimeAuthority {
        pdes_logging::log_to_stderr();
        TimeAuthority::with_time_base(base).unwrap()
    }

    #[test]
    fn test_same_text_same_converter() -> Result<()> {
        let ta = authority("1ps");
        let a = ta.resolve_str("5ns")?;
        let b = ta.resolve_str("5ns")?;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.factor(), 5000);
        Ok(())
    }

    #[test]
    fn test_dedup_across_forms() -> Result<()> {
        let ta = authority("1ns");
        // 1ns, 1us and 1ms were created by init.
        assert_eq!(ta.converter_count(), 3);

        let a = ta.resolve_str("1us")?;
        let b = ta.resolve_str("1000ns")?;
        let c = ta.resolve_quantity(&Quantity::parse("1MHz")?)?;
        let d = ta.resolve_factor(1000)?;
        assert_eq!(a.factor(), 1000);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert!(Arc::ptr_eq(&a, &d));
        assert!(Arc::ptr_eq(&a, &ta.micro()?));
        assert_eq!(ta.converter_count(), 3);
        Ok(())
    }

    #[test]
    fn test_shortcuts() -> Result<()> {
        let ta = authority("1ps");
        assert_eq!(ta.nano()?.factor(), 1_000);
        assert_eq!(ta.micro()?.factor(), 1_000_000);
        assert_eq!(ta.milli()?.factor(), 1_000_000_000);
        assert_eq!(ta.time_base_string()?, "1ps");
        assert_eq!(ta.time_base()?, &Quantity::parse("1ps")?);
        Ok(())
    }

    #[test]
    fn test_frequencies_and_rounding() -> Result<()> {
        let ta = authority("1ns");
        assert_eq!(ta.sim_cycles("1GHz")?, 1);
        assert_eq!(ta.sim_cycles("100MHz")?, 10);
        assert_eq!(ta.sim_cycles("2.5us")?, 2500);
        assert_eq!(ta.sim_cycles("1.4ns")?, 1);
        assert_eq!(ta.sim_cycles("1.5ns")?, 2);
        // 3 MHz is a period of 333.33... ns.
        assert_eq!(ta.sim_cycles("3MHz")?, 333);
        Ok(())
    }

    #[test]
    fn test_uninitialized() {
        let ta = TimeAuthority::new();
        assert!(!ta.is_initialized());
        assert!(matches!(ta.resolve_str("1ns"), Err(TimeError::Uninitialized)));
        assert!(matches!(
            ta.resolve_quantity(&Quantity::parse("1ns").unwrap()),
            Err(TimeError::Uninitialized)
        ));
        assert!(matches!(ta.resolve_factor(5), Err(TimeError::Uninitialized)));
        assert!(matches!(ta.sim_cycles("1ns"), Err(TimeError::Uninitialized)));
        assert!(matches!(ta.nano(), Err(TimeError::Uninitialized)));
    }

    #[test]
    fn test_unsupported_unit() {
        let ta = authority("1ps");
        match ta.resolve_quantity(&Quantity::parse("1m").unwrap()) {
            Err(TimeError::UnsupportedUnit(u)) => assert!(u.contains('m')),
            other => panic!("Expected UnsupportedUnit, got {:?}", other),
        }
        assert!(matches!(
            ta.resolve_str("4B"),
            Err(TimeError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn test_overflow() {
        // Far finer than the time base.
        let ta = authority("1fs");
        assert!(matches!(
            ta.resolve_str("1ys"),
            Err(TimeError::ResolutionOverflow { .. })
        ));

        // Far more ticks than fit in a u64.
        let ta = authority("1ys");
        match ta.resolve_str("1Ys") {
            Err(TimeError::ResolutionOverflow {
                requested,
                time_base,
            }) => {
                assert_eq!(requested, Quantity::parse("1Ys").unwrap().to_string());
                assert_eq!(time_base, "1ys");
            }
            other => panic!("Expected ResolutionOverflow, got {:?}", other),
        }

        let ta = authority("1zs");
        assert!(matches!(
            ta.resolve_str("1Ys"),
            Err(TimeError::ResolutionOverflow { .. })
        ));
    }

    #[test]
    fn test_coarse_time_bases() -> Result<()> {
        for (base, ticks_per_second) in [
            ("10ns", 100_000_000),
            ("1us", 1_000_000),
            ("1ms", 1_000),
            ("1s", 1),
        ] {
            let ta = TimeAuthority::with_time_base(base)?;
            assert_eq!(ta.sim_cycles("1s")?, ticks_per_second, "time base {}", base);
        }

        let ta = authority("1us");
        assert!(matches!(ta.nano(), Err(TimeError::ResolutionOverflow { .. })));
        assert_eq!(ta.micro()?.factor(), 1);
        assert_eq!(ta.milli()?.factor(), 1_000);

        let ta = authority("1s");
        assert!(matches!(ta.nano(), Err(TimeError::ResolutionOverflow { .. })));
        assert!(matches!(ta.micro(), Err(TimeError::ResolutionOverflow { .. })));
        assert!(matches!(ta.milli(), Err(TimeError::ResolutionOverflow { .. })));
        Ok(())
    }

    #[test]
    fn test_shortcuts_too_large_for_fine_base() -> Result<()> {
        // A millisecond is 1e21 yoctoseconds, past u64::MAX.
        let ta = authority("1ys");
        assert_eq!(ta.nano()?.factor(), 1_000_000_000_000_000);
        assert_eq!(ta.micro()?.factor(), 1_000_000_000_000_000_000);
        assert!(matches!(ta.milli(), Err(TimeError::ResolutionOverflow { .. })));
        Ok(())
    }

    #[test]
    fn test_failures_are_not_cached() {
        let ta = authority("1fs");
        let before = ta.converter_count();
        assert!(ta.resolve_str("1ys").is_err());
        assert!(ta.resolve_str("1ys").is_err());
        assert_eq!(ta.converter_count(), before);
    }

    #[test]
    fn test_non_positive() {
        let ta = authority("1ns");
        assert!(matches!(ta.resolve_str("0ns"), Err(TimeError::NonPositive(_))));
        assert!(matches!(ta.resolve_str("-5ns"), Err(TimeError::NonPositive(_))));
        assert!(matches!(ta.resolve_str("0Hz"), Err(TimeError::NonPositive(_))));
        assert!(matches!(ta.resolve_factor(0), Err(TimeError::NonPositive(_))));
    }

    #[test]
    fn test_bad_time_base() {
        assert!(matches!(
            TimeAuthority::with_time_base("garbage"),
            Err(TimeError::Quantity(_))
        ));
        assert!(matches!(
            TimeAuthority::with_time_base("1GHz"),
            Err(TimeError::UnsupportedUnit(_))
        ));
        assert!(matches!(
            TimeAuthority::with_time_base("0ps"),
            Err(TimeError::NonPositive(_))
        ));
    }

    #[test]
    fn test_reinit_keeps_converters() -> Result<()> {
        let mut ta = authority("1ns");
        let old = ta.resolve_str("1us")?;
        ta.init("1ps")?;
        assert_eq!(old.factor(), 1000);
        assert_eq!(ta.sim_cycles("1us")?, 1_000_000);
        assert!(Arc::ptr_eq(&old, &ta.nano()?));
        Ok(())
    }

    proptest! {
        #[test]
        fn test_sim_cycles_matches_factor(n in 1..1_000_000u64, unit in prop::sample::select(vec!["ps", "ns", "us", "ms", "s"])) {
            let ta = authority("1ps");
            let text = format!("{}{}", n, unit);
            let tc = ta.resolve_str(&text).unwrap();
            prop_assert_eq!(ta.sim_cycles(&text).unwrap(), tc.factor());
            prop_assert!(Arc::ptr_eq(&tc, &ta.resolve_str(&text).unwrap()));
        }
    }
}
