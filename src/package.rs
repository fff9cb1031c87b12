//! Packaging of a single class unit into the input jar Krakatau consumes.
//!
//! Krakatau is handed a one-entry jar whose entry is always named
//! `Target.class`, whatever the unit's real name is. The real name only shows
//! up in the temp-file name (through a hash prefix) and in diagnostics.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const UNIT_ENTRY_NAME: &str = "Target.class";

static SEQ: AtomicU64 = AtomicU64::new(0);

/// A temp file owned by exactly one decompile call, removed on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserves a fresh artifact path without writing any content. Used for
    /// the output target handed to the external process.
    pub fn reserve(unit_name: &str, tag: &str) -> Self {
        Self {
            path: temp_artifact_path(unit_name, tag),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        // Best effort; the OS temp cleaner catches anything left behind.
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Writes `bytes` verbatim into a fresh single-entry jar and returns the
/// closed, fully flushed artifact.
pub fn package_unit(unit_name: &str, bytes: &[u8]) -> Result<TempArtifact> {
    let artifact = TempArtifact::reserve(unit_name, "");
    let file = File::create(artifact.path()).with_context(|| {
        format!(
            "Failed to create temp jar for class \"{unit_name}\": {}",
            artifact.path().display()
        )
    })?;

    let mut jar = ZipWriter::new(file);
    jar.start_file(UNIT_ENTRY_NAME, FileOptions::default())?;
    jar.write_all(bytes)?;
    jar.finish()
        .with_context(|| format!("Failed to flush temp jar for class \"{unit_name}\""))?;

    Ok(artifact)
}

// Deterministic hash prefix for debugging, pid + sequence suffix so two
// concurrent requests for the same unit never share a path.
fn temp_artifact_path(unit_name: &str, tag: &str) -> PathBuf {
    let digest = Sha256::digest(unit_name.as_bytes());
    let prefix = hex::encode(&digest[..8]);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "{prefix}{tag}-{}-{}.jar",
        std::process::id(),
        seq
    ))
}
