use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Resolved settings for one bridge instance. Built once from the CLI and
/// environment; individual decompile calls do not consult the environment
/// again.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Interpreter used to run the Krakatau entry point.
    pub python: String,
    /// On-disk toolchain archive staged instead of the embedded one.
    pub toolchain_zip: Option<PathBuf>,
    /// Bound on how long one external invocation may run.
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            python: resolve_python(None),
            toolchain_zip: resolve_toolchain_zip(None),
            timeout: resolve_timeout(None),
        }
    }
}

impl BridgeConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            python: resolve_python(cli.python.clone()),
            toolchain_zip: resolve_toolchain_zip(cli.toolchain.clone()),
            timeout: resolve_timeout(cli.timeout_secs),
        }
    }
}

pub fn resolve_python(flag: Option<String>) -> String {
    if let Some(p) = flag {
        return p;
    }
    env::var("KRAKATAU_PYTHON").unwrap_or_else(|_| "python".to_string())
}

pub fn resolve_toolchain_zip(flag: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = flag {
        return Some(p);
    }
    env::var("KRAKATAU_ZIP").ok().map(PathBuf::from)
}

pub fn resolve_timeout(flag: Option<u64>) -> Duration {
    let secs = flag
        .or_else(|| {
            env::var("KRAKATAU_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
        })
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs.max(1))
}
