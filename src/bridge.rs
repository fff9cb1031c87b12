//! The decompiler bridge itself: bytes in, displayable text out.
//!
//! `decompile` never returns an error. Every internal failure is classified
//! into diagnostic text, so callers can hand the result straight to a viewer
//! without a separate error path.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::diagnose::{FailureStage, classify};
use crate::extract::{self, EMPTY_OUTPUT_DIAGNOSTIC};
use crate::invoke::Invoker;
use crate::package::{self, TempArtifact};
use crate::stage;

/// One decompiler backend as seen by the caller. The result is always plain
/// text; diagnostics are distinguished only by their content.
pub trait DecompilerBridge {
    /// Decompiles one class unit. `container` is the archive the unit came
    /// from, passed to the toolchain so cross-references resolve.
    fn decompile(&self, container: &Path, unit_name: &str, unit_bytes: &[u8]) -> String;

    /// Accepted for parity with other backends; Krakatau has no aggressive
    /// mode, so this is a no-op.
    fn set_aggressive(&mut self, aggressive: bool);

    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct KrakatauBridge {
    config: BridgeConfig,
}

impl KrakatauBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    fn run(
        &self,
        toolchain_root: &Path,
        unit_jar: &TempArtifact,
        container: &Path,
        unit_name: &str,
    ) -> Result<String> {
        let invoker = Invoker::new(self.config.python.clone(), self.config.timeout);
        let invocation =
            invoker.invoke(unit_name, unit_jar.path(), container, toolchain_root)?;

        let mut text = invocation.preamble;
        match extract::read_output(invocation.output.path())? {
            Some(source) => text.push_str(&source),
            None => {
                debug!(unit = unit_name, status = ?invocation.status, "empty output jar");
                text.push_str(EMPTY_OUTPUT_DIAGNOSTIC);
            }
        }
        Ok(text)
    }
}

impl DecompilerBridge for KrakatauBridge {
    fn decompile(&self, container: &Path, unit_name: &str, unit_bytes: &[u8]) -> String {
        let toolchain_root = match stage::ensure_ready(self.config.toolchain_zip.as_deref()) {
            Ok(root) => root,
            Err(e) => return classify(FailureStage::Staging, unit_name, &e),
        };

        let unit_jar = match package::package_unit(unit_name, unit_bytes) {
            Ok(artifact) => artifact,
            Err(e) => return classify(FailureStage::Packaging, unit_name, &e),
        };

        match self.run(&toolchain_root, &unit_jar, container, unit_name) {
            Ok(text) => text,
            Err(e) => classify(FailureStage::Invocation, unit_name, &e),
        }
    }

    fn set_aggressive(&mut self, _aggressive: bool) {}

    fn name(&self) -> &'static str {
        "Krakatau"
    }

    fn version(&self) -> &'static str {
        "22-05-20"
    }
}
