//! Sdkctl - administrative dispatcher for a VM-based cross-compilation SDK
//!
//! Sdkctl orchestrates the external tools that make up the SDK: the system
//! package manager for cross-toolchains, the scratchbox2 sandbox for
//! per-target build environments, archive download and extraction for
//! target rootfs installation, filtered mirroring of target sysroots into a
//! host-visible directory, and the VM/IDE integration tools.
//!
//! # Quick Start
//!
//! ```bash
//! # Install a target from a rootfs archive
//! sdkctl target install alpha sdk-toolchain-armv7hl https://example.org/rootfs.tar.bz2
//!
//! # Refresh its host-visible mirror
//! sdkctl target sync alpha
//!
//! # Remove it again
//! sdkctl target remove alpha
//!
//! # Check SDK health
//! sdkctl sdk status
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod error;
pub mod mirror;
pub mod models;
pub mod sandbox;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SdkError};
pub use models::{TargetName, TargetPaths, ToolchainArch};
pub use store::TargetStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
