#![forbid(unsafe_code)]

mod limits;
mod procfs_probe;

pub use limits::{LimitsParseError, parse_open_files_limit};
pub use procfs_probe::ProcfsLimitProbe;

use crate::domain::{Measurement, ProbeOutcome};
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("process {pid} no longer exists")]
    Gone { pid: i32 },

    #[error("permission denied reading {what} of process {pid}")]
    PermissionDenied { pid: i32, what: &'static str },

    #[error("failed to read {what} of process {pid}: {reason}")]
    Read {
        pid: i32,
        what: &'static str,
        reason: String,
    },

    #[error("malformed limits of process {pid}: {source}")]
    Limits {
        pid: i32,
        #[source]
        source: LimitsParseError,
    },

    #[error("probe of process {pid} {reason}")]
    Task { pid: i32, reason: String },
}

impl ProbeError {
    pub(crate) fn from_proc(pid: i32, what: &'static str, err: procfs::ProcError) -> Self {
        match err {
            procfs::ProcError::NotFound(_) => Self::Gone { pid },
            procfs::ProcError::PermissionDenied(_) => Self::PermissionDenied { pid, what },
            procfs::ProcError::Io(err, _) => Self::from_io(pid, what, err),
            other => Self::Read {
                pid,
                what,
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn from_io(pid: i32, what: &'static str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound
            || err.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32)
        {
            Self::Gone { pid }
        } else if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { pid, what }
        } else {
            Self::Read {
                pid,
                what,
                reason: err.to_string(),
            }
        }
    }
}

impl From<ProbeError> for ProbeOutcome {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Gone { pid } => ProbeOutcome::Gone { pid },
            ProbeError::PermissionDenied { pid, .. }
            | ProbeError::Read { pid, .. }
            | ProbeError::Limits { pid, .. }
            | ProbeError::Task { pid, .. } => ProbeOutcome::Failed {
                pid,
                cause: err.to_string(),
            },
        }
    }
}

pub trait LimitProbe: Send + Sync {
    /// Measure the open-files usage of one process. Never fails: every error
    /// is folded into the returned outcome.
    fn probe(&self, pid: i32) -> ProbeOutcome;
}

/// Raw per-process data a [`LimitProbe`] is computed from. Swapping the
/// source keeps the measurement rules untouched.
pub trait LimitSource {
    fn exec_name(&self, pid: i32) -> Result<String, ProbeError>;
    /// Text of the limits report, in the `/proc/<pid>/limits` layout.
    fn limits_text(&self, pid: i32) -> Result<String, ProbeError>;
    fn open_fd_count(&self, pid: i32) -> Result<u64, ProbeError>;
}

/// Run the measurement steps against a source.
pub fn probe_with<S: LimitSource + ?Sized>(source: &S, pid: i32) -> ProbeOutcome {
    let exec_name = match source.exec_name(pid) {
        Ok(name) => Some(name),
        Err(err) => {
            trace!(pid, %err, "executable name unavailable");
            None
        }
    };

    let text = match source.limits_text(pid) {
        Ok(text) => text,
        Err(err) => return err.into(),
    };

    let limits = match parse_open_files_limit(&text) {
        Ok(limits) => limits,
        Err(source) => return ProbeError::Limits { pid, source }.into(),
    };

    if limits.soft == 0 {
        return ProbeOutcome::Unlimited {
            pid,
            hard_limit: limits.hard,
        };
    }

    match source.open_fd_count(pid) {
        Ok(open_fds) => ProbeOutcome::Measured(Measurement::new(pid, open_fds, limits, exec_name)),
        Err(err) => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticSource {
        exec_name: Option<&'static str>,
        limits: Result<&'static str, fn(i32) -> ProbeError>,
        fds: Result<u64, fn(i32) -> ProbeError>,
        fds_read: AtomicBool,
    }

    impl StaticSource {
        fn new(limits: &'static str, fds: u64) -> Self {
            Self {
                exec_name: Some("nginx"),
                limits: Ok(limits),
                fds: Ok(fds),
                fds_read: AtomicBool::new(false),
            }
        }
    }

    impl LimitSource for StaticSource {
        fn exec_name(&self, pid: i32) -> Result<String, ProbeError> {
            self.exec_name
                .map(str::to_owned)
                .ok_or(ProbeError::PermissionDenied { pid, what: "exe" })
        }

        fn limits_text(&self, pid: i32) -> Result<String, ProbeError> {
            self.limits.map(str::to_owned).map_err(|make| make(pid))
        }

        fn open_fd_count(&self, pid: i32) -> Result<u64, ProbeError> {
            self.fds_read.store(true, Ordering::SeqCst);
            self.fds.map_err(|make| make(pid))
        }
    }

    const LIMITED: &str = "Max open files            1024                 4096                 files     \n";
    const SOFT_UNLIMITED: &str = "Max open files            unlimited            4096                 files     \n";

    #[test]
    fn measures_usage_percent() {
        let outcome = probe_with(&StaticSource::new(LIMITED, 512), 42);
        let ProbeOutcome::Measured(measurement) = outcome else {
            panic!("expected a measurement, got {outcome:?}");
        };
        assert_eq!(measurement.pid, 42);
        assert_eq!(measurement.open_fds, 512);
        assert_eq!(measurement.soft_limit, 1024);
        assert_eq!(measurement.hard_limit, 4096);
        assert_eq!(measurement.usage_percent, 50.0);
        assert_eq!(measurement.exec_name.as_deref(), Some("nginx"));
    }

    #[test]
    fn usage_is_not_clamped() {
        let outcome = probe_with(&StaticSource::new(LIMITED, 2048), 1);
        assert!(matches!(outcome, ProbeOutcome::Measured(m) if m.usage_percent == 200.0));
    }

    #[test]
    fn unresolved_exec_name_is_omitted() {
        let source = StaticSource {
            exec_name: None,
            ..StaticSource::new(LIMITED, 1)
        };
        let outcome = probe_with(&source, 7);
        assert!(matches!(outcome, ProbeOutcome::Measured(m) if m.exec_name.is_none()));
    }

    #[test]
    fn unlimited_soft_limit_skips_fd_count() {
        let source = StaticSource::new(SOFT_UNLIMITED, 10);
        let outcome = probe_with(&source, 9);
        assert_eq!(
            outcome,
            ProbeOutcome::Unlimited {
                pid: 9,
                hard_limit: 4096
            }
        );
        assert!(!source.fds_read.load(Ordering::SeqCst));
    }

    #[test]
    fn vanished_process_is_gone() {
        let source = StaticSource {
            limits: Err(|pid| ProbeError::Gone { pid }),
            ..StaticSource::new(LIMITED, 1)
        };
        assert_eq!(probe_with(&source, 3), ProbeOutcome::Gone { pid: 3 });

        let source = StaticSource {
            fds: Err(|pid| ProbeError::Gone { pid }),
            ..StaticSource::new(LIMITED, 1)
        };
        assert_eq!(probe_with(&source, 4), ProbeOutcome::Gone { pid: 4 });
    }

    #[test]
    fn read_errors_fail_with_cause() {
        let source = StaticSource {
            limits: Err(|pid| ProbeError::PermissionDenied { pid, what: "limits" }),
            ..StaticSource::new(LIMITED, 1)
        };
        let outcome = probe_with(&source, 5);
        assert!(
            matches!(&outcome, ProbeOutcome::Failed { pid: 5, cause } if cause.contains("permission denied"))
        );
    }

    #[test]
    fn malformed_limits_fail() {
        let outcome = probe_with(&StaticSource::new("Max open files\n", 1), 6);
        assert!(
            matches!(&outcome, ProbeOutcome::Failed { pid: 6, cause } if cause.contains("malformed limits"))
        );
    }

    #[test]
    fn io_errors_are_classified() {
        let gone = ProbeError::from_io(1, "limits", std::io::ErrorKind::NotFound.into());
        assert!(matches!(gone, ProbeError::Gone { pid: 1 }));

        let esrch = std::io::Error::from_raw_os_error(nix::errno::Errno::ESRCH as i32);
        assert!(matches!(ProbeError::from_io(2, "fd", esrch), ProbeError::Gone { pid: 2 }));

        let denied = ProbeError::from_io(3, "fd", std::io::ErrorKind::PermissionDenied.into());
        assert!(matches!(denied, ProbeError::PermissionDenied { pid: 3, what: "fd" }));
    }
}
