//! Conversion of internal failures into the displayable text the bridge
//! returns. Nothing in this crate lets an error cross the bridge boundary;
//! every failure mode ends up here and comes back as a string.

use std::fmt;

use crate::invoke::{LaunchError, TimeoutError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Staging,
    Packaging,
    Invocation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Staging => write!(f, "staging"),
            FailureStage::Packaging => write!(f, "packaging"),
            FailureStage::Invocation => write!(f, "invocation"),
        }
    }
}

/// Turns a stage failure into diagnostic text. Launch and timeout failures
/// get their own wording; everything else names the stage and the unit and
/// carries the full error chain.
pub fn classify(stage: FailureStage, unit_name: &str, err: &anyhow::Error) -> String {
    if let Some(launch) = err.downcast_ref::<LaunchError>() {
        return launch_diagnostic(launch);
    }
    if let Some(timeout) = err.downcast_ref::<TimeoutError>() {
        return format!(
            "Krakatau timed out for class \"{unit_name}\" after {}s.\n\
             The external toolchain may be hanging on malformed input.",
            timeout.limit.as_secs()
        );
    }

    match stage {
        FailureStage::Staging => {
            format!("Failed to unzip krakatau in temp directory.\n{err:#}")
        }
        FailureStage::Packaging => {
            format!("Failed to make temp jar for class \"{unit_name}\"\n{err:#}")
        }
        FailureStage::Invocation => {
            format!("Failed krakatau execution for class \"{unit_name}\"\n{err:#}")
        }
    }
}

// Deliberately verbose: a missing interpreter is a configuration problem,
// and the environment listing is what operators need to spot it.
fn launch_diagnostic(launch: &LaunchError) -> String {
    format!(
        "Could not run python executable. Please set your python path \
         correctly to use krakatau.\nError: {launch}\n\n\
         /*\nYour environment variables:\n{}\n*/",
        environment_dump()
    )
}

pub fn environment_dump() -> String {
    let mut lines: Vec<String> = std::env::vars()
        .map(|(k, v)| format!("{k} = \"{v}\""))
        .collect();
    lines.sort();
    lines.join("\n")
}
