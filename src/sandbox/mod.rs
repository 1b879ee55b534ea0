//! Sandbox management for cross-compilation targets
//!
//! Every installed target is entered through a sandboxing tool that remaps
//! the filesystem root to the target's sysroot and, for foreign
//! architectures, runs binaries under CPU emulation.

mod sb2;

pub use sb2::Scratchbox2;

use std::path::Path;

use crate::error::Result;
use crate::models::{TargetName, ToolchainArch};

/// Trait for sandbox implementations
pub trait SandboxManager {
    /// Initialize the sandbox configuration for a freshly extracted target
    fn init_target(&self, name: &TargetName, sysroot: &Path, arch: ToolchainArch) -> Result<()>;

    /// Whether a sandbox configuration exists for `name`
    fn config_exists(&self, name: &TargetName) -> bool;

    /// Check that the configuration for `name` is present and loadable
    fn validate_config(&self, name: &TargetName) -> Result<()>;

    /// Delete the sandbox configuration for `name`
    fn remove_config(&self, name: &TargetName) -> Result<()>;

    /// Run a command inside the target's sandbox, returning its exit code
    fn run_in_target(&self, name: &TargetName, argv: &[&str]) -> Result<i32>;

    /// Run a command inside the target's sandbox and capture its stdout
    fn run_in_target_capture(&self, name: &TargetName, argv: &[&str]) -> Result<String>;
}
