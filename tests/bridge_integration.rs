use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "krakatau_bridge_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, FileOptions::default())?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(unix)]
fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn run(bin: &str, args: &[&str], envs: &[(&str, &str)]) -> anyhow::Result<std::process::Output> {
    let mut cmd = Command::new(bin);
    cmd.args(args);
    for (k, v) in envs {
        cmd.env(k, v);
    }
    Ok(cmd.output()?)
}

fn run_json(bin: &str, args: &[&str], envs: &[(&str, &str)]) -> anyhow::Result<Value> {
    let out = run(bin, args, envs)?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[test]
fn info_reports_bridge_descriptor() -> anyhow::Result<()> {
    let bin = env!("CARGO_BIN_EXE_krakatau-bridge");
    let info = run_json(bin, &["info"], &[])?;
    assert_eq!(info["name"], Value::String("Krakatau".to_string()));
    assert_eq!(info["version"], Value::String("22-05-20".to_string()));
    Ok(())
}

#[test]
fn list_shows_top_level_classes() -> anyhow::Result<()> {
    let base = temp_dir("list");
    let jar = base.join("demo.jar");
    write_jar(
        &jar,
        &[
            ("org/example/A.class", b"" as &[u8]),
            ("org/example/A$Inner.class", b""),
            ("org/example/B.class", b""),
        ],
    )?;

    let bin = env!("CARGO_BIN_EXE_krakatau-bridge");
    let listed = run_json(bin, &["list", jar.to_string_lossy().as_ref()], &[])?;
    assert_eq!(
        listed,
        serde_json::json!(["org/example/A", "org/example/B"])
    );

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[cfg(unix)]
#[test]
fn decompile_round_trips_through_fake_interpreter() -> anyhow::Result<()> {
    let base = temp_dir("decompile");
    let jar = base.join("demo.jar");
    write_jar(&jar, &[("org/example/Demo.class", b"\xca\xfe\xba\xbe" as &[u8])])?;

    // Fake JDK so the rt.jar warning does not prefix the output.
    let jdk = base.join("jdk");
    std::fs::create_dir_all(jdk.join("lib"))?;
    std::fs::write(jdk.join("lib").join("rt.jar"), b"stub")?;

    // The fake interpreter receives: decompile.py -skip -out OUT IN -path JAR
    // and copies a prepared output jar over OUT.
    let prepared = base.join("prepared.jar");
    write_jar(
        &prepared,
        &[(
            "Target.java",
            b"package org.example;\n\npublic class Demo {\n}\n" as &[u8],
        )],
    )?;
    let fake_python = base.join("bin").join("python");
    write_file(
        &fake_python,
        &format!("#!/bin/sh\nset -e\ncp '{}' \"$4\"\n", prepared.display()),
    )?;
    make_executable(&fake_python)?;

    let bin = env!("CARGO_BIN_EXE_krakatau-bridge");
    let result = run_json(
        bin,
        &[
            "--python",
            fake_python.to_string_lossy().as_ref(),
            "decompile",
            jar.to_string_lossy().as_ref(),
            "org.example.Demo",
            "--format",
            "json",
        ],
        &[("JAVA_HOME", jdk.to_string_lossy().as_ref())],
    )?;

    assert_eq!(result["class_name"], "org.example.Demo");
    let content = result["content"].as_str().unwrap_or_default();
    assert_eq!(content, "package org.example;\n\npublic class Demo {\n}\n");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[cfg(unix)]
#[test]
fn missing_interpreter_still_produces_text() -> anyhow::Result<()> {
    let base = temp_dir("nopython");
    let jar = base.join("demo.jar");
    write_jar(&jar, &[("org/example/Demo.class", b"\xca\xfe\xba\xbe" as &[u8])])?;

    let bin = env!("CARGO_BIN_EXE_krakatau-bridge");
    let out = run(
        bin,
        &[
            "--python",
            base.join("no-such-python").to_string_lossy().as_ref(),
            "decompile",
            jar.to_string_lossy().as_ref(),
            "org.example.Demo",
        ],
        &[],
    )?;

    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Could not run python executable"));
    assert!(text.contains("Your environment variables:"));
    assert!(text.contains("PATH = \""));

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[cfg(unix)]
#[test]
fn batch_writes_one_source_file_per_class() -> anyhow::Result<()> {
    let base = temp_dir("batch");
    let jar = base.join("demo.jar");
    write_jar(
        &jar,
        &[
            ("org/example/A.class", b"\xca\xfe\xba\xbe" as &[u8]),
            ("org/example/B.class", b"\xca\xfe\xba\xbe"),
        ],
    )?;

    let jdk = base.join("jdk");
    std::fs::create_dir_all(jdk.join("lib"))?;
    std::fs::write(jdk.join("lib").join("rt.jar"), b"stub")?;

    let prepared = base.join("prepared.jar");
    write_jar(&prepared, &[("Target.java", b"class X {}\n" as &[u8])])?;
    let fake_python = base.join("bin").join("python");
    write_file(
        &fake_python,
        &format!("#!/bin/sh\nset -e\ncp '{}' \"$4\"\n", prepared.display()),
    )?;
    make_executable(&fake_python)?;

    let out_dir = base.join("sources");
    let bin = env!("CARGO_BIN_EXE_krakatau-bridge");
    let summary = run_json(
        bin,
        &[
            "--python",
            fake_python.to_string_lossy().as_ref(),
            "batch",
            jar.to_string_lossy().as_ref(),
            "--out-dir",
            out_dir.to_string_lossy().as_ref(),
            "--jobs",
            "2",
        ],
        &[("JAVA_HOME", jdk.to_string_lossy().as_ref())],
    )?;

    assert_eq!(summary["classes"], Value::from(2));
    assert_eq!(summary["written"], Value::from(2));
    assert_eq!(
        std::fs::read_to_string(out_dir.join("org/example/A.java"))?,
        "class X {}\n"
    );
    assert_eq!(
        std::fs::read_to_string(out_dir.join("org/example/B.java"))?,
        "class X {}\n"
    );

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}
