//! Shared helpers for tests that touch process-global state (environment
//! variables, temp files, fake interpreter scripts).

use anyhow::Result;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;

/// Serializes every test that reads or writes JAVA_HOME / PATH.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "krakatau_bridge_test_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, FileOptions::default())?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(unix)]
pub fn write_script(path: &Path, content: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = File::create(path)?;
    f.write_all(content.as_bytes())?;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

/// Points JAVA_HOME at `dir` with an rt.jar present, so invocations take the
/// no-warning path. Callers must hold [`env_lock`].
pub fn set_java_home(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir.join("lib"))?;
    std::fs::write(dir.join("lib").join("rt.jar"), b"stub")?;
    // SAFETY: callers hold env_lock for the duration of the test.
    unsafe { std::env::set_var("JAVA_HOME", dir) };
    Ok(())
}
