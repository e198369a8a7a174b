#![forbid(unsafe_code)]

//! Parser for the `Max open files` row of a Linux `/proc/<pid>/limits`
//! report.
//!
//! The report is a fixed-width table: the limit name occupies the first
//! 26 columns, followed by whitespace-separated soft limit, hard limit and
//! units.

use crate::domain::LimitSnapshot;

const OPEN_FILES_MARKER: &str = "Max open files";
const LABEL_WIDTH: usize = 26;
const UNLIMITED: &str = "unlimited";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitsParseError {
    #[error("no \"Max open files\" line")]
    MissingLine,

    #[error("\"Max open files\" line is shorter than 26 columns: {line:?}")]
    ShortLine { line: String },

    #[error("\"Max open files\" line has no {field} limit")]
    MissingField { field: &'static str },

    #[error("invalid {field} limit {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Extract the open-files soft and hard limits. `unlimited` maps to `0`.
pub fn parse_open_files_limit(text: &str) -> Result<LimitSnapshot, LimitsParseError> {
    let line = text
        .lines()
        .find(|line| line.starts_with(OPEN_FILES_MARKER))
        .ok_or(LimitsParseError::MissingLine)?;

    let values = line
        .get(LABEL_WIDTH..)
        .ok_or_else(|| LimitsParseError::ShortLine {
            line: line.to_owned(),
        })?;

    let mut fields = values.split_whitespace();
    let soft = parse_limit("soft", fields.next())?;
    let hard = parse_limit("hard", fields.next())?;
    Ok(LimitSnapshot { soft, hard })
}

fn parse_limit(field: &'static str, value: Option<&str>) -> Result<u64, LimitsParseError> {
    let value = value.ok_or(LimitsParseError::MissingField { field })?;
    if value == UNLIMITED {
        return Ok(0);
    }
    value
        .parse::<u64>()
        .map_err(|_| LimitsParseError::InvalidValue {
            field,
            value: value.to_owned(),
        })
}
