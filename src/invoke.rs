//! Launching the external Krakatau process.
//!
//! The interpreter runs `decompile.py` with the staged toolchain root as its
//! working directory. Stdout and stderr share one chatter file so diagnostic
//! output stays in a single stream. The wait is bounded; a child that
//! outlives the timeout is killed.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::package::TempArtifact;

pub const RT_JAR_WARNING: &str =
    "/* Cannot find rt.jar, this may cause decompilation errors */\n";

const WAIT_POLL: Duration = Duration::from_millis(50);

/// The interpreter could not be started at all. Kept as a distinct error
/// type so the classifier can attach the environment dump.
#[derive(Debug)]
pub struct LaunchError {
    pub python: String,
    pub source: std::io::Error,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot run program \"{}\": {}", self.python, self.source)
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// The external process exceeded the configured wait bound and was killed.
#[derive(Debug)]
pub struct TimeoutError {
    pub limit: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Krakatau did not finish within {}s and was killed",
            self.limit.as_secs()
        )
    }
}

impl std::error::Error for TimeoutError {}

#[derive(Debug)]
pub struct Invocation {
    /// Output jar the external process was told to write. Owned by this
    /// call; removed when dropped.
    pub output: TempArtifact,
    /// Text to prepend to whatever the extractor returns (rt.jar warning).
    pub preamble: String,
    /// Exit status of the external process. Recorded for logging only;
    /// success is inferred from the output archive.
    pub status: ExitStatus,
}

#[derive(Debug, Clone)]
pub struct Invoker {
    python: String,
    timeout: Duration,
}

impl Invoker {
    pub fn new(python: String, timeout: Duration) -> Self {
        Self { python, timeout }
    }

    pub fn invoke(
        &self,
        unit_name: &str,
        unit_jar: &Path,
        container: &Path,
        toolchain_root: &Path,
    ) -> Result<Invocation> {
        let output = TempArtifact::reserve(unit_name, "-decompiled");
        let chatter = TempArtifact::reserve(unit_name, "-chatter");
        let mut preamble = String::new();

        let mut cmd = Command::new(&self.python);
        cmd.arg("decompile.py")
            .arg("-skip")
            .arg("-out")
            .arg(output.path())
            .arg(unit_jar)
            .arg("-path")
            .arg(container);

        match runtime_jar_path() {
            Some(rt) => {
                cmd.arg("-path").arg(rt).arg("-nauto");
            }
            None => preamble.push_str(RT_JAR_WARNING),
        }

        // Both streams point at the same file, so interleaved chatter lands
        // in one place without any pipe-draining thread.
        let chatter_file = File::create(chatter.path()).with_context(|| {
            format!("Failed to create chatter file: {}", chatter.path().display())
        })?;
        let chatter_clone = chatter_file
            .try_clone()
            .context("Failed to clone chatter file handle")?;

        cmd.current_dir(toolchain_root)
            .stdin(Stdio::null())
            .stdout(chatter_file)
            .stderr(chatter_clone);

        debug!(python = %self.python, unit = unit_name, "spawning krakatau");
        let mut child = cmd.spawn().map_err(|source| {
            anyhow::Error::new(LaunchError {
                python: self.python.clone(),
                source,
            })
        })?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child
                .try_wait()
                .context("Failed to poll the external process")?
            {
                break status;
            }
            if started.elapsed() >= self.timeout {
                warn!(unit = unit_name, "krakatau timed out, killing child");
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow::Error::new(TimeoutError {
                    limit: self.timeout,
                }));
            }
            std::thread::sleep(WAIT_POLL);
        };

        if !status.success() {
            let chatter_text =
                std::fs::read_to_string(chatter.path()).unwrap_or_default();
            warn!(
                unit = unit_name,
                ?status,
                chatter = chatter_text.trim(),
                "krakatau exited non-zero; output archive decides the result"
            );
        }

        Ok(Invocation {
            output,
            preamble,
            status,
        })
    }
}

/// Conventional platform runtime jar, resolved relative to the installed
/// JDK (`$JAVA_HOME/lib/rt.jar`). Absent on JDK 9+ layouts.
pub fn runtime_jar_path() -> Option<PathBuf> {
    let home = std::env::var_os("JAVA_HOME")?;
    let rt = PathBuf::from(home).join("lib").join("rt.jar");
    rt.is_file().then_some(rt)
}
