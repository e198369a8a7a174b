#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Greater-or-equal thresholds on the open-files usage percentage.
///
/// A bound of `0` is disabled. At least one bound must be set and, when both
/// are, `warn_ge` must be strictly below `critical_ge`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Thresholds {
    pub warn_ge: f64,
    pub critical_ge: f64,
}

impl Thresholds {
    pub fn new(warn_ge: f64, critical_ge: f64) -> Self {
        Self {
            warn_ge,
            critical_ge,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("warn_ge", self.warn_ge), ("critical_ge", self.critical_ge)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("open_files.{name} must be within [0, 100], got {value}"));
            }
        }
        if self.warn_ge == 0.0 && self.critical_ge == 0.0 {
            return Err("open_files: at least one of warn_ge and critical_ge must be set".into());
        }
        if self.warn_ge > 0.0 && self.critical_ge > 0.0 && self.warn_ge >= self.critical_ge {
            return Err(format!(
                "open_files.warn_ge ({}) must be less than critical_ge ({})",
                self.warn_ge, self.critical_ge
            ));
        }
        Ok(())
    }
}
