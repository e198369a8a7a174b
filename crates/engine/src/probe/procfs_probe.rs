#![forbid(unsafe_code)]

use crate::discovery::procfs_table::{DEFAULT_PROC_ROOT, exec_name_of};
use crate::domain::ProbeOutcome;
use crate::probe::{LimitProbe, LimitSource, ProbeError, probe_with};
use procfs::process::Process;
use std::path::PathBuf;

/// Reads limits from `<root>/<pid>/limits` and counts entries of
/// `<root>/<pid>/fd`.
#[derive(Debug, Clone)]
pub struct ProcfsLimitProbe {
    root: PathBuf,
}

impl Default for ProcfsLimitProbe {
    fn default() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsLimitProbe {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pid_dir(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn process(&self, pid: i32) -> Result<Process, ProbeError> {
        Process::new_with_root(self.pid_dir(pid))
            .map_err(|err| ProbeError::from_proc(pid, "process", err))
    }
}

impl LimitSource for ProcfsLimitProbe {
    fn exec_name(&self, pid: i32) -> Result<String, ProbeError> {
        exec_name_of(&self.process(pid)?)
    }

    fn limits_text(&self, pid: i32) -> Result<String, ProbeError> {
        std::fs::read_to_string(self.pid_dir(pid).join("limits"))
            .map_err(|err| ProbeError::from_io(pid, "limits", err))
    }

    fn open_fd_count(&self, pid: i32) -> Result<u64, ProbeError> {
        self.process(pid)?
            .fd_count()
            .map(|count| count as u64)
            .map_err(|err| ProbeError::from_proc(pid, "fd", err))
    }
}

impl LimitProbe for ProcfsLimitProbe {
    fn probe(&self, pid: i32) -> ProbeOutcome {
        probe_with(self, pid)
    }
}
