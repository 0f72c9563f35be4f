//! Tax liability calculation.
//!
//! The engine is a pure function of a [`crate::TaxInput`] and a
//! [`crate::RateTable`]. It performs no I/O and never fails.

pub mod common;
pub mod liability;
pub mod schedule;

pub use liability::{LiabilityCalculator, compute, compute_with};
pub use schedule::RateSchedule;
