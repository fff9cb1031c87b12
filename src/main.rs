use anyhow::{Context, Result};
use clap::Parser;
use krakatau_bridge::bridge::{DecompilerBridge, KrakatauBridge};
use krakatau_bridge::cli::{Cli, Commands, OutputFormat};
use krakatau_bridge::config::BridgeConfig;
use krakatau_bridge::container::{list_units, read_unit_bytes};
use krakatau_bridge::pool::{DecompilePool, DecompileTask, PoolConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::from_cli(&cli);

    match cli.command.clone() {
        Commands::Info => {
            let bridge = KrakatauBridge::new(config);
            let info = BridgeInfo {
                name: bridge.name(),
                version: bridge.version(),
            };
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::List { jar_path } => {
            let units = list_units(&jar_path)?;
            println!("{}", serde_json::to_string_pretty(&units)?);
        }
        Commands::Decompile {
            jar_path,
            class_name,
            format,
            output,
        } => {
            let class_name = normalize_class_name(&class_name);
            let result = decompile_one(config, &jar_path, &class_name)?;
            write_decompile_output(&result, format, output.as_deref())?;
        }
        Commands::Batch {
            jar_path,
            out_dir,
            jobs,
        } => {
            let summary = batch_decompile(config, &jar_path, &out_dir, jobs)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct BridgeInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct DecompileOutput {
    class_name: String,
    jar_path: String,
    duration_ms: u64,
    content: String,
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    jar_path: String,
    out_dir: String,
    classes: usize,
    written: usize,
    duration_ms: u64,
}

fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn decompile_one(
    config: BridgeConfig,
    jar_path: &Path,
    class_name: &str,
) -> Result<DecompileOutput> {
    let start = Instant::now();
    let bytes = read_unit_bytes(jar_path, class_name)?;
    let bridge = KrakatauBridge::new(config);
    let content = bridge.decompile(jar_path, class_name, &bytes);

    Ok(DecompileOutput {
        class_name: class_name.to_string(),
        jar_path: jar_path.to_string_lossy().to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        content,
    })
}

fn batch_decompile(
    config: BridgeConfig,
    jar_path: &Path,
    out_dir: &Path,
    jobs: usize,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let units = list_units(jar_path)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let bridge = Arc::new(KrakatauBridge::new(config));
    let (results_tx, results_rx) = std::sync::mpsc::channel();
    let mut pool = DecompilePool::new(
        bridge,
        jar_path.to_path_buf(),
        PoolConfig {
            max_concurrent: jobs.max(1),
            ..PoolConfig::default()
        },
        results_tx,
    );

    for unit_name in &units {
        let unit_bytes = read_unit_bytes(jar_path, unit_name)?;
        pool.submit(DecompileTask {
            unit_name: unit_name.clone(),
            unit_bytes,
        })?;
    }
    pool.shutdown_and_drain()?;

    let mut written = 0usize;
    for result in results_rx {
        let dest = unit_output_path(out_dir, &result.unit_name);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, &result.text)
            .with_context(|| format!("Failed to write: {}", dest.display()))?;
        written += 1;
    }

    Ok(BatchSummary {
        jar_path: jar_path.to_string_lossy().to_string(),
        out_dir: out_dir.to_string_lossy().to_string(),
        classes: units.len(),
        written,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn unit_output_path(out_dir: &Path, unit_name: &str) -> PathBuf {
    let rel = format!("{}.java", unit_name.replace('.', "/"));
    out_dir.join(rel)
}

fn write_decompile_output(
    result: &DecompileOutput,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Code => result.content.clone(),
    };

    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
