use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use config::Config;
use std::path::{Path, PathBuf};
use tracing::trace;

const DEFAULT_CONFIG: &str = "/etc/procfd/config.toml";
const DEFAULT_CONFIG_DIR_GLOB: &str = "/etc/procfd/config.d/*.toml";

/// procfd: open-files pressure check for running processes
///
/// procfd finds the processes selected by each configured instance, measures
/// how close each one is to its open-files soft limit and reports the worst
/// one as a single alert event per instance and cycle. Events are written to
/// stdout as JSON lines.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/procfd/config.toml` and `/etc/procfd/config.d/*.toml`, where the
    /// latter being a glob pattern merged in lexical order.
    #[arg(short, long, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Run every check once and exit.
    #[arg(long)]
    pub once: bool,

    /// Log events instead of writing them to stdout.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    /// Load the configuration from `--config` or the default locations.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                let mut candidates = glob::glob(DEFAULT_CONFIG_DIR_GLOB)?
                    .filter_map(Result::ok)
                    .collect::<Vec<_>>();
                candidates.sort();
                candidates.insert(0, DEFAULT_CONFIG.into());
                trace!(?candidates, "config file candidates");
                Config::load_multiple(candidates)?
            }
        };
        Ok(config)
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
