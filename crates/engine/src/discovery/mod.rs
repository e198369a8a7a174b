#![forbid(unsafe_code)]

mod matcher;
pub(crate) mod procfs_table;

pub use procfs_table::{ProcfsHandle, ProcfsTable};

use crate::domain::SelectionCriterion;
use crate::error::Error;
use crate::probe::ProbeError;
use std::path::Path;
use tracing::trace;

/// A live process identifier with attributes fetched on demand. Handles only
/// live for one visit since the OS may recycle identifiers.
pub trait ProcessHandle: Send {
    fn pid(&self) -> i32;
    fn exec_name(&self) -> Result<String, ProbeError>;
    /// Command-line arguments joined with single spaces.
    fn cmdline(&self) -> Result<String, ProbeError>;
    /// Name of the owning user.
    fn user(&self) -> Result<String, ProbeError>;
}

pub trait ProcessTable: Send + Sync {
    /// Hand every live process at call time to `visitor`, in no particular
    /// order. A handle is released before the next one is opened.
    fn visit(&self, visitor: &mut dyn FnMut(&dyn ProcessHandle)) -> Result<(), Error>;
    fn is_alive(&self, pid: i32) -> bool;
}

/// Resolve the criterion into the PIDs to probe.
pub fn discover(
    table: &dyn ProcessTable,
    criterion: &SelectionCriterion,
) -> Result<Vec<i32>, Error> {
    match criterion {
        SelectionCriterion::PidFile(path) => {
            let pid = read_pid_file(Path::new(path))?;
            if table.is_alive(pid) {
                Ok(vec![pid])
            } else {
                trace!(pid, %path, "pid from pid file is not alive");
                Ok(Vec::new())
            }
        }
        SelectionCriterion::Match(spec) => {
            let mut pids = Vec::new();
            table.visit(&mut |handle| {
                if spec.matches(handle) {
                    pids.push(handle.pid());
                }
            })?;
            Ok(pids)
        }
    }
}

fn read_pid_file(path: &Path) -> Result<i32, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::PidFileRead {
        path: path.to_owned(),
        source,
    })?;
    match content.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(Error::PidFileParse {
            path: path.to_owned(),
            content,
        }),
    }
}
