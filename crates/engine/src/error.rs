#![forbid(unsafe_code)]

use std::path::PathBuf;

/// Failures that abandon a whole probe cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to enumerate processes: {reason}")]
    Enumeration { reason: String },

    #[error("failed to read pid file {path:?}: {source}")]
    PidFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pid file {path:?} does not hold a positive integer: {content:?}")]
    PidFileParse { path: PathBuf, content: String },

    #[error("invalid process selection: {0}")]
    InvalidCriterion(String),
}
