#![forbid(unsafe_code)]

mod criterion;
mod outcome;

pub use criterion::{MatchSpec, SelectionCriterion};
pub use outcome::{LimitSnapshot, Measurement, ProbeOutcome};
