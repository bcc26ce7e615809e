//! Cleaning, spatial aggregation and significance filtering of signal samples.
//!
//! The stages run strictly forward: sanitize metrics, drop stationary
//! repeats, aggregate onto the coordinate grid, discard ghost technologies,
//! then hand the survivors to the statistics engine. [`analyzer::analyze`]
//! drives the whole chain.

pub mod aggregate;
pub mod analyzer;
pub mod grade;
pub mod sanitize;
pub mod significance;
pub mod stationary;
pub mod types;
pub mod utility;

#[cfg(test)]
pub(crate) mod testutil;
