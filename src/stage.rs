//! One-time staging of the bundled Krakatau toolchain.
//!
//! The toolchain ships as a zip embedded in the binary and is extracted into
//! a fresh temp directory on the first decompile call. The extracted root is
//! shared by every bridge instance in the process; extraction never runs
//! twice unless the first attempt failed.

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use zip::ZipArchive;

const BUNDLED_TOOLCHAIN: &[u8] = include_bytes!("../resources/krakatau.zip");

// None until the first successful extraction. The lock is held across the
// whole check-and-extract sequence, so concurrent first callers block on the
// winner; a failed attempt leaves None and the next call retries.
static STAGED_ROOT: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Returns the staged toolchain root, extracting the archive first if this is
/// the first call (or every earlier attempt failed).
pub fn ensure_ready(override_zip: Option<&Path>) -> Result<PathBuf> {
    let mut slot = STAGED_ROOT.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(root) = slot.as_ref() {
        return Ok(root.clone());
    }

    let root = match override_zip {
        Some(zip_path) => {
            let bytes = std::fs::read(zip_path).with_context(|| {
                format!("Failed to read toolchain archive: {}", zip_path.display())
            })?;
            stage_toolchain(Cursor::new(bytes))?
        }
        None => stage_toolchain(Cursor::new(BUNDLED_TOOLCHAIN))?,
    };

    debug!(root = %root.display(), "staged krakatau toolchain");
    *slot = Some(root.clone());
    Ok(root)
}

fn stage_toolchain<R: Read + Seek>(reader: R) -> Result<PathBuf> {
    let root = fresh_staging_dir();
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create staging directory: {}", root.display()))?;

    let mut archive =
        ZipArchive::new(reader).context("Failed to open the toolchain archive")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            bail!("Toolchain entry escapes the staging root: {}", entry.name());
        };
        let dest = root.join(rel);
        // enclosed_name already rejects traversal; keep the invariant checked
        // against the final resolved path as well.
        if !dest.starts_with(&root) {
            bail!("Toolchain entry escapes the staging root: {}", entry.name());
        }

        if entry.is_dir() {
            std::fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)
            .with_context(|| format!("Failed to extract: {}", dest.display()))?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(root)
}

fn fresh_staging_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("krakatau-{}-{}", std::process::id(), nanos))
}
