use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "krakatau-bridge")]
#[command(about = "Decompile JVM class files to readable source via the bundled Krakatau toolchain")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Interpreter used to run Krakatau (default: python, or KRAKATAU_PYTHON)
    #[arg(long, value_name = "BIN")]
    pub python: Option<String>,

    /// Toolchain zip staged instead of the embedded one (or KRAKATAU_ZIP)
    #[arg(long, value_name = "FILE")]
    pub toolchain: Option<PathBuf>,

    /// Upper bound on one external invocation, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Decompile one class from a jar
    Decompile {
        jar_path: PathBuf,

        /// Class name, dotted (org.example.Demo) or internal (org/example/Demo)
        class_name: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Code)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Decompile every top-level class in a jar into a directory
    Batch {
        jar_path: PathBuf,

        #[arg(short = 'd', long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Parallel external invocations
        #[arg(short = 'j', long, value_name = "N", default_value_t = 2)]
        jobs: usize,
    },
    /// List the top-level classes in a jar
    List { jar_path: PathBuf },
    /// Print bridge name and version
    Info,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Code,
    Json,
}
