//! Read access to the container archive the units come from.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

pub fn class_name_to_entry(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

pub fn entry_to_unit_name(entry_name: &str) -> String {
    entry_name.trim_end_matches(".class").to_string()
}

/// Lists top-level `.class` entries (internal `a/b/C` form, no inner
/// classes).
pub fn list_units(container: &Path) -> Result<Vec<String>> {
    let file = File::open(container)
        .with_context(|| format!("Failed to open jar: {}", container.display()))?;
    // SAFETY: The file is opened read-only and outlives the mmap; the mmap is
    // dropped before the file.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", container.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read jar: {}", container.display()))?;

    let mut units = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name();
        if !name.ends_with(".class") || name.contains('$') {
            continue;
        }
        units.push(entry_to_unit_name(name));
    }
    units.sort();
    Ok(units)
}

/// Reads one unit's raw bytecode. `unit_name` may be dotted or internal
/// (slash) form.
pub fn read_unit_bytes(container: &Path, unit_name: &str) -> Result<Vec<u8>> {
    let entry_name = class_name_to_entry(unit_name);

    let file = File::open(container)
        .with_context(|| format!("Failed to open jar: {}", container.display()))?;
    // SAFETY: as above.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", container.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read jar: {}", container.display()))?;

    let Ok(mut entry) = archive.by_name(&entry_name) else {
        bail!(
            "Class {unit_name} not found in {} (looked for entry {entry_name})",
            container.display()
        );
    };
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}
