//! Test doubles and fixtures.
//!
//! Available outside `cfg(test)` so downstream crates can script pipeline
//! behavior in their own tests.

pub mod fixtures;
mod mocks;

pub use mocks::{FailingSink, FailingSource, FlakySink, ScriptedOracle, SkewedSink, StallingOracle};
