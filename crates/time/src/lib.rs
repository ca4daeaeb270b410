//! Simulated time for the engine.
//!
//! Simulated time is an integer count of ticks, where one tick is the configured time base (e.g. `1ps`).  The
//! [TimeAuthority] turns physical times and frequencies into [TimeConverter]s which carry the number of ticks per unit,
//! and does so identically on every rank and across checkpoint/restart.
mod authority;
mod config;
mod converter;
mod errors;
mod quantity;

pub use authority::*;
pub use config::*;
pub use converter::*;
pub use errors::*;
pub use quantity::*;
