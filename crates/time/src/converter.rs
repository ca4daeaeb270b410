//! Integer conversion factors between a unit of time and simulation ticks.
use crate::quantity::Quantity;

/// Simulated time, in ticks of the time base.
pub type SimTime = u64;

/// The largest representable tick count.
pub const MAX_SIM_TIME: SimTime = SimTime::MAX;

/// "N simulation ticks per unit of this converter".
///
/// Converters are only ever created by the [crate::TimeAuthority], which hands them out behind an `Arc` and never
/// mutates them afterward, so they can be read from any thread without locking.  Two requests resolving to the same
/// factor get the same converter.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TimeConverter {
    factor: SimTime,
}

impl TimeConverter {
    pub(crate) fn new(factor: SimTime) -> TimeConverter {
        debug_assert_ne!(factor, 0, "Converters always have a positive factor");
        TimeConverter { factor }
    }

    /// Ticks of the time base per unit of this converter.
    pub fn factor(&self) -> SimTime {
        self.factor
    }

    /// Convert `value` units of this converter to ticks.  `None` if the result would not fit.
    pub fn convert_to_core_time(&self, value: u64) -> Option<SimTime> {
        value.checked_mul(self.factor)
    }

    /// Convert ticks to whole units of this converter, truncating.
    pub fn convert_from_core_time(&self, ticks: SimTime) -> u64 {
        ticks / self.factor
    }

    /// The physical duration of one unit of this converter under the given time base.
    pub fn period(&self, time_base: &Quantity) -> Quantity {
        time_base.scaled_by(self.factor)
    }
}
