#![forbid(unsafe_code)]

use crate::thresholds::Thresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// One monitored process group: how to find the processes and when to alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Instance {
    /// Substring of the executable name.
    pub search_exec_name: String,

    /// Substring of the full command line (arguments joined with spaces).
    pub search_cmdline: String,

    /// Name of the user owning the process.
    pub search_user: String,

    /// File holding the PID of the process to watch.
    ///
    /// # Note
    ///
    /// Cannot be combined with any of the other search fields.
    pub search_pid_file: String,

    /// Maximum number of processes probed at the same time. `0` falls back
    /// to the default of 10.
    pub concurrency: usize,

    /// Title template for produced events. Applied verbatim; an empty rule
    /// uses `[check] [target]`.
    pub title_rule: String,

    /// Extra labels attached to every event of this instance.
    pub labels: BTreeMap<String, String>,

    pub open_files: Thresholds,
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            search_exec_name: String::new(),
            search_cmdline: String::new(),
            search_user: String::new(),
            search_pid_file: String::new(),
            concurrency: DEFAULT_CONCURRENCY,
            title_rule: String::new(),
            labels: BTreeMap::new(),
            open_files: Thresholds::default(),
        }
    }
}

impl Instance {
    /// Trim the search fields, apply defaults and check the invariants.
    pub fn normalize(&mut self) -> Result<(), String> {
        for field in [
            &mut self.search_exec_name,
            &mut self.search_cmdline,
            &mut self.search_user,
            &mut self.search_pid_file,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_owned();
            }
        }

        if self.concurrency == 0 {
            self.concurrency = DEFAULT_CONCURRENCY;
        }

        let has_match_fields = !self.search_exec_name.is_empty()
            || !self.search_cmdline.is_empty()
            || !self.search_user.is_empty();

        if self.search_pid_file.is_empty() && !has_match_fields {
            return Err(
                "one of search_exec_name, search_cmdline, search_user or search_pid_file must be set"
                    .into(),
            );
        }
        if !self.search_pid_file.is_empty() && has_match_fields {
            return Err("search_pid_file cannot be combined with other search fields".into());
        }

        self.open_files.validate()
    }
}
