#![forbid(unsafe_code)]

use crate::domain::{Measurement, ProbeOutcome};

/// All outcomes of one cycle folded into the worst measurement and counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedResult {
    /// Measurement with the highest usage; the first one wins ties.
    pub worst: Option<Measurement>,
    pub matched: usize,
    /// Number of [`ProbeOutcome::Measured`] outcomes.
    pub checked: usize,
    /// Number of [`ProbeOutcome::Failed`] outcomes.
    pub errors: usize,
    /// Cause of the first failure, kept for the error event.
    pub first_error: Option<String>,
}

/// What the cycle should report.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<'a> {
    /// Nothing could be checked and nothing failed: stay silent.
    Suppress,
    /// Every probed process failed.
    AllErrored,
    Evaluate(&'a Measurement),
}

impl ReducedResult {
    pub fn verdict(&self) -> Verdict<'_> {
        match (&self.worst, self.errors) {
            (Some(worst), _) => Verdict::Evaluate(worst),
            (None, 0) => Verdict::Suppress,
            (None, _) => Verdict::AllErrored,
        }
    }
}

pub fn reduce(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> ReducedResult {
    let mut result = ReducedResult::default();
    for outcome in outcomes {
        result.matched += 1;
        match outcome {
            ProbeOutcome::Gone { .. } | ProbeOutcome::Unlimited { .. } => {}
            ProbeOutcome::Failed { cause, .. } => {
                result.errors += 1;
                result.first_error.get_or_insert(cause);
            }
            ProbeOutcome::Measured(measurement) => {
                result.checked += 1;
                let worse = result
                    .worst
                    .as_ref()
                    .is_none_or(|worst| measurement.usage_percent > worst.usage_percent);
                if worse {
                    result.worst = Some(measurement);
                }
            }
        }
    }
    result
}
