//! Command-line interface for sdkctl

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::TargetName;

/// Sdkctl - administrative dispatcher for a VM-based cross-compilation SDK
///
/// Manages cross-toolchains, sysroot targets and their host-visible
/// mirrors, and reports SDK health. Intended to be driven by the SDK's
/// web UI; requires elevated privilege.
#[derive(Parser, Debug)]
#[command(name = "sdkctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SDKCTL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available command groups
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage cross-toolchains on the host
    Toolchain {
        #[command(subcommand)]
        command: ToolchainCommands,
    },

    /// Manage sysroot targets
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },

    /// Manage development packages inside a target
    Devel {
        #[command(subcommand)]
        command: DevelCommands,
    },

    /// SDK-level maintenance and health
    Sdk {
        #[command(subcommand)]
        command: SdkCommands,
    },

    /// Refresh every target, then the SDK itself
    RefreshAll,
}

/// Toolchain subcommands
#[derive(Subcommand, Debug)]
pub enum ToolchainCommands {
    /// List installed and installable toolchains
    List,

    /// Install a toolchain package
    Install {
        /// Toolchain package name
        package: String,
    },

    /// Remove a toolchain package
    Remove {
        /// Toolchain package name
        package: String,
    },
}

/// Target subcommands
#[derive(Subcommand, Debug)]
pub enum TargetCommands {
    /// List installed targets
    List,

    /// List pending package updates inside a target
    Upgradable {
        /// Target name
        name: TargetName,
    },

    /// Install (or replace) a target from a rootfs archive
    Install {
        /// Target name
        name: TargetName,

        /// Toolchain package the target builds with
        toolchain: String,

        /// Rootfs archive: URL, plain path or file:// reference
        url: String,

        /// Skip the toolchain presence check
        #[arg(long)]
        jfdi: bool,
    },

    /// Remove a target
    Remove {
        /// Target name
        name: TargetName,
    },

    /// Refresh package metadata inside targets
    Refresh {
        /// Refresh every installed target
        #[arg(long, conflicts_with = "names")]
        all: bool,

        /// Target names to refresh
        names: Vec<TargetName>,
    },

    /// Apply pending package updates inside a target
    Update {
        /// Target name
        name: TargetName,
    },

    /// Refresh the host-visible mirror from the target's sysroot
    Sync {
        /// Target name
        name: TargetName,
    },

    /// Copy the host-visible mirror back into the target's sysroot
    Import {
        /// Target name
        name: TargetName,
    },
}

/// Development-package subcommands (run inside a target)
#[derive(Subcommand, Debug)]
pub enum DevelCommands {
    /// List development packages available in a target
    List {
        /// Target name
        target: TargetName,

        /// Optional search pattern
        search: Option<String>,
    },

    /// Install packages into a target
    Install {
        /// Target name
        target: TargetName,

        /// Packages to install
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Remove packages from a target
    Remove {
        /// Target name
        target: TargetName,

        /// Packages to remove
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

/// SDK-level subcommands
#[derive(Subcommand, Debug)]
pub enum SdkCommands {
    /// Print SDK release information
    Version,

    /// Refresh the host package metadata
    Refresh,

    /// List pending SDK updates
    Upgradable,

    /// Upgrade the SDK
    Upgrade,

    /// Check SDK health (VM shared folders)
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::Parser;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_target_install_grammar() {
        let cli = Cli::try_parse_from([
            "sdkctl",
            "target",
            "install",
            "--jfdi",
            "alpha",
            "sdk-toolchain-armv7hl",
            "file:///tmp/rootfs.tar.bz2",
        ])
        .unwrap();

        match cli.command {
            Commands::Target {
                command:
                    TargetCommands::Install {
                        name,
                        toolchain,
                        url,
                        jfdi,
                    },
            } => {
                assert_eq!(name.as_str(), "alpha");
                assert_eq!(toolchain, "sdk-toolchain-armv7hl");
                assert_eq!(url, "file:///tmp/rootfs.tar.bz2");
                assert!(jfdi);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_target_name_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from(["sdkctl", "target", "remove", "bad name!"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_devel_install_requires_packages() {
        let result = Cli::try_parse_from(["sdkctl", "devel", "install", "alpha"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_refresh_all_and_names_conflict() {
        let result = Cli::try_parse_from(["sdkctl", "target", "refresh", "--all", "alpha"]);
        assert!(result.is_err());
    }
}
