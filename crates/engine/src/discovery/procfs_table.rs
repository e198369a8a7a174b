#![forbid(unsafe_code)]

use crate::discovery::{ProcessHandle, ProcessTable};
use crate::error::Error;
use crate::probe::ProbeError;
use nix::errno::Errno;
use nix::unistd::{Uid, User};
use procfs::ProcError;
use procfs::process::Process;
use std::path::PathBuf;
use tracing::trace;

pub(crate) const DEFAULT_PROC_ROOT: &str = "/proc";

const DELETED_SUFFIX: &str = " (deleted)";

/// Process table backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcfsTable {
    root: PathBuf,
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsTable {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProcessTable for ProcfsTable {
    fn visit(&self, visitor: &mut dyn FnMut(&dyn ProcessHandle)) -> Result<(), Error> {
        let entries = procfs::process::all_processes_with_root(&self.root).map_err(|err| {
            Error::Enumeration {
                reason: err.to_string(),
            }
        })?;

        // Every `Process` pins an open directory fd, so each one is dropped
        // before the next entry is opened.
        for entry in entries {
            match entry {
                Ok(process) => visitor(&ProcfsHandle { process }),
                Err(err) if exhausts_descriptors(&err) => {
                    return Err(Error::Enumeration {
                        reason: format!("out of file descriptors: {err}"),
                    });
                }
                Err(err) => trace!(?err, "skipping unreadable process entry"),
            }
        }
        Ok(())
    }

    fn is_alive(&self, pid: i32) -> bool {
        Process::new_with_root(self.root.join(pid.to_string()))
            .map(|process| process.is_alive())
            .unwrap_or(false)
    }
}

/// Open `/proc/<pid>` directory; every attribute is read when asked for.
#[derive(Debug)]
pub struct ProcfsHandle {
    process: Process,
}

impl ProcessHandle for ProcfsHandle {
    fn pid(&self) -> i32 {
        self.process.pid
    }

    fn exec_name(&self) -> Result<String, ProbeError> {
        exec_name_of(&self.process)
    }

    fn cmdline(&self) -> Result<String, ProbeError> {
        self.process
            .cmdline()
            .map(|args| args.join(" "))
            .map_err(|err| ProbeError::from_proc(self.process.pid, "cmdline", err))
    }

    fn user(&self) -> Result<String, ProbeError> {
        let uid = self
            .process
            .uid()
            .map_err(|err| ProbeError::from_proc(self.process.pid, "owner", err))?;
        Ok(user_name(uid))
    }
}

/// File name of the executable, or the kernel's command name when the `exe`
/// link cannot be read (kernel threads, other users' processes).
pub(crate) fn exec_name_of(process: &Process) -> Result<String, ProbeError> {
    let pid = process.pid;
    match process.exe() {
        Ok(path) => {
            if let Some(name) = path.file_name() {
                let name = name.to_string_lossy();
                return Ok(name.strip_suffix(DELETED_SUFFIX).unwrap_or(&name[..]).to_owned());
            }
        }
        Err(err) => trace!(pid, ?err, "exe link unreadable, falling back to comm"),
    }
    process
        .stat()
        .map(|stat| stat.comm)
        .map_err(|err| ProbeError::from_proc(pid, "stat", err))
}

/// EMFILE or ENFILE. Skipping such an entry would hide a live process.
fn exhausts_descriptors(err: &ProcError) -> bool {
    match err {
        ProcError::Io(err, _) => matches!(
            err.raw_os_error(),
            Some(code) if code == Errno::EMFILE as i32 || code == Errno::ENFILE as i32
        ),
        _ => false,
    }
}

fn user_name(uid: u32) -> String {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}
