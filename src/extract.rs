//! Reading the decompiled source back out of Krakatau's output jar.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

pub const EMPTY_OUTPUT_DIAGNOSTIC: &str = "Error: Krakatau output file is empty.";

/// Reads the sole decompiled entry from the output jar. `Ok(None)` means the
/// archive exists but has no entries, the recognized empty-output condition.
pub fn read_output(output_jar: &Path) -> Result<Option<String>> {
    let file = File::open(output_jar)
        .with_context(|| format!("Failed to open output jar: {}", output_jar.display()))?;
    // SAFETY: The file is opened read-only and outlives the mmap; the mmap is
    // dropped before the file.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap output jar: {}", output_jar.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read output jar: {}", output_jar.display()))?;

    if archive.is_empty() {
        return Ok(None);
    }

    let mut entry = archive.by_index(0)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .context("Failed to read the decompiled entry")?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
