//! # krakatau-bridge
//!
//! Decompiles single JVM class units to readable source by staging a bundled
//! Krakatau toolchain and driving it out-of-process. The bridge never fails
//! at the API level: every call returns text, either decompiled source or a
//! diagnostic explaining what went wrong.
//!
//! ## Architecture
//!
//! - **stage**: One-time extraction of the embedded toolchain archive
//! - **package**: Single-entry input jar packaging for one class unit
//! - **invoke**: External interpreter launch with bounded wait
//! - **extract**: Output jar reading and the empty-output condition
//! - **diagnose**: Failure classification into displayable diagnostics
//! - **bridge**: The `DecompilerBridge` trait and Krakatau implementation
//! - **container**: Read access to the archive the units come from
//! - **pool**: Bounded worker pool for whole-archive decompilation
//! - **config**: Interpreter, toolchain, and timeout resolution

pub mod bridge;
pub mod cli;
pub mod config;
pub mod container;
pub mod diagnose;
pub mod extract;
pub mod invoke;
pub mod package;
pub mod pool;
pub mod stage;

#[cfg(test)]
pub(crate) mod testutil;
