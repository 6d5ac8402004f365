//! Async helpers that don't belong to any single jukebox crate.
//!
//! - [`SingleFlight`] collapses concurrent requests for the same piece of work
//!   into one shared future.
//! - [`InFlight`] is a non-reentrant "is something already running?" flag
//!   with an RAII guard.

mod in_flight;
mod single_flight;

pub use crate::in_flight::{InFlight, InFlightGuard};
pub use crate::single_flight::SingleFlight;
