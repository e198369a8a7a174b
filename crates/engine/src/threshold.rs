#![forbid(unsafe_code)]

use crate::event::Severity;

/// Classify `value` against greater-or-equal bounds. A bound of `0` is
/// disabled; critical is checked first.
pub fn evaluate_ge_threshold(value: f64, warn_ge: f64, critical_ge: f64) -> Severity {
    if critical_ge > 0.0 && value >= critical_ge {
        Severity::Critical
    } else if warn_ge > 0.0 && value >= warn_ge {
        Severity::Warning
    } else {
        Severity::Ok
    }
}
