#![forbid(unsafe_code)]

use crate::discovery::ProcessHandle;
use crate::domain::MatchSpec;
use crate::probe::ProbeError;
use tracing::trace;

impl MatchSpec {
    /// Whether the process satisfies every configured condition.
    ///
    /// Executable name and command line are case-sensitive substring checks,
    /// the user must be equal. An attribute that cannot be read (usually
    /// because the process exited) counts as a mismatch.
    pub fn matches(&self, handle: &dyn ProcessHandle) -> bool {
        if let Some(wanted) = &self.exec_name
            && !check(handle, handle.exec_name(), |name| name.contains(wanted.as_str()))
        {
            return false;
        }
        if let Some(wanted) = &self.cmdline
            && !check(handle, handle.cmdline(), |cmdline| cmdline.contains(wanted.as_str()))
        {
            return false;
        }
        if let Some(wanted) = &self.user
            && !check(handle, handle.user(), |user| user == wanted)
        {
            return false;
        }
        true
    }
}

fn check(
    handle: &dyn ProcessHandle,
    attribute: Result<String, ProbeError>,
    predicate: impl FnOnce(&str) -> bool,
) -> bool {
    match attribute {
        Ok(value) => predicate(&value),
        Err(err) => {
            trace!(pid = handle.pid(), %err, "process attribute unavailable");
            false
        }
    }
}
