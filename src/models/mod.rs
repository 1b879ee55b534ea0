//! Data models for sdkctl

mod target;
mod toolchain;

pub use target::{TargetName, TargetPaths};
pub use toolchain::ToolchainArch;
