#![forbid(unsafe_code)]

/// Open-files limits of one process. `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSnapshot {
    pub soft: u64,
    pub hard: u64,
}

/// A process whose open-files usage could be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub pid: i32,
    pub open_fds: u64,
    /// Always non-zero.
    pub soft_limit: u64,
    /// `0` means unlimited.
    pub hard_limit: u64,
    /// `100 * open_fds / soft_limit`, not clamped.
    pub usage_percent: f64,
    pub exec_name: Option<String>,
}

impl Measurement {
    pub fn new(
        pid: i32,
        open_fds: u64,
        limits: LimitSnapshot,
        exec_name: Option<String>,
    ) -> Self {
        Self {
            pid,
            open_fds,
            soft_limit: limits.soft,
            hard_limit: limits.hard,
            usage_percent: 100.0 * open_fds as f64 / limits.soft as f64,
            exec_name,
        }
    }
}

/// Result of probing a single process. Exactly one per probed PID.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Measured(Measurement),
    /// Soft limit is unlimited, so no usage percentage exists.
    Unlimited { pid: i32, hard_limit: u64 },
    /// The process exited between discovery and probing.
    Gone { pid: i32 },
    Failed { pid: i32, cause: String },
}

impl ProbeOutcome {
    pub fn pid(&self) -> i32 {
        match self {
            Self::Measured(measurement) => measurement.pid,
            Self::Unlimited { pid, .. } | Self::Gone { pid } | Self::Failed { pid, .. } => *pid,
        }
    }
}
