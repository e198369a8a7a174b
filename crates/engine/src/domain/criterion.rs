#![forbid(unsafe_code)]

use crate::error::Error;
use config::Instance;
use std::path::Path;

/// Attribute conditions that must all hold for a process to match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchSpec {
    pub exec_name: Option<String>,
    pub cmdline: Option<String>,
    pub user: Option<String>,
}

impl MatchSpec {
    fn is_empty(&self) -> bool {
        self.exec_name.is_none() && self.cmdline.is_none() && self.user.is_none()
    }
}

/// How the processes of one check are selected. Built once per check and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCriterion {
    /// Exactly the process whose PID is stored in this file.
    PidFile(String),
    /// Every live process matching all set fields.
    Match(MatchSpec),
}

impl SelectionCriterion {
    /// Build a criterion from raw search fields. Fields are trimmed and empty
    /// ones are ignored.
    pub fn new(exec_name: &str, cmdline: &str, user: &str, pid_file: &str) -> Result<Self, Error> {
        let non_empty = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_owned())
        };

        let spec = MatchSpec {
            exec_name: non_empty(exec_name),
            cmdline: non_empty(cmdline),
            user: non_empty(user),
        };

        match (non_empty(pid_file), spec.is_empty()) {
            (Some(path), true) => Ok(Self::PidFile(path)),
            (Some(_), false) => Err(Error::InvalidCriterion(
                "pid file cannot be combined with other search fields".into(),
            )),
            (None, false) => Ok(Self::Match(spec)),
            (None, true) => Err(Error::InvalidCriterion("no search field is set".into())),
        }
    }

    pub fn from_instance(instance: &Instance) -> Result<Self, Error> {
        Self::new(
            &instance.search_exec_name,
            &instance.search_cmdline,
            &instance.search_user,
            &instance.search_pid_file,
        )
    }

    pub fn pid_file(&self) -> Option<&Path> {
        match self {
            Self::PidFile(path) => Some(Path::new(path)),
            Self::Match(_) => None,
        }
    }

    /// Human-readable description of the selection, used as the `target`
    /// label of events.
    pub fn target_label(&self) -> String {
        match self {
            Self::PidFile(path) => path.clone(),
            Self::Match(spec) => {
                let mut parts = Vec::with_capacity(3);
                if let Some(exec_name) = &spec.exec_name {
                    parts.push(exec_name.clone());
                }
                if let Some(cmdline) = &spec.cmdline {
                    parts.push(cmdline.clone());
                }
                if let Some(user) = &spec.user {
                    parts.push(format!("user:{user}"));
                }
                parts.join(" && ")
            }
        }
    }
}
