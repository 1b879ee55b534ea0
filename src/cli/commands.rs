//! Command execution handlers

use console::style;
use tracing::info;

use crate::backends::{HttpFetcher, PackageBackend, SdkToolNotifier, VBoxGuest, Zypper};
use crate::config::Config;
use crate::error::{Result, SdkError};
use crate::models::TargetName;
use crate::sandbox::{SandboxManager, Scratchbox2};
use crate::store::TargetStore;

/// zypper's "no matches" exit code for search
const ZYPPER_NO_MATCHES: i32 = 104;

/// Execute a toolchain subcommand
pub async fn execute_toolchain(config: &Config, command: &super::ToolchainCommands) -> Result<()> {
    let zypper = Zypper::new(&config.tools.zypper);

    match command {
        super::ToolchainCommands::List => {
            let packages = zypper.list(&config.sdk.toolchain_pattern)?;
            if packages.is_empty() {
                println!("No toolchains available");
            }
            for pkg in packages {
                let marker = if pkg.installed {
                    style("installed").green()
                } else {
                    style("available").dim()
                };
                match pkg.version {
                    Some(version) => println!("{} {} [{}]", pkg.name, version, marker),
                    None => println!("{} [{}]", pkg.name, marker),
                }
            }
            Ok(())
        }
        super::ToolchainCommands::Install { package } => {
            if zypper.is_installed(package)? {
                return Err(SdkError::AlreadyInstalled(package.clone()));
            }
            zypper.install(package)?;
            println!("Toolchain {} installed", style(package).bold());
            Ok(())
        }
        super::ToolchainCommands::Remove { package } => {
            if !zypper.is_installed(package)? {
                return Err(SdkError::NotInstalled(package.clone()));
            }
            zypper.remove(package)?;
            println!("Toolchain {} removed", style(package).bold());
            Ok(())
        }
    }
}

/// Execute a target subcommand
pub async fn execute_target(config: &Config, command: &super::TargetCommands) -> Result<()> {
    let zypper = Zypper::new(&config.tools.zypper);
    let fetcher = HttpFetcher::new(&config.network)?;
    let sandbox = Scratchbox2::new(config)?;
    let ide = SdkToolNotifier::new(&config.tools);
    let store = TargetStore::new(config, &zypper, &fetcher, &sandbox, &ide);

    match command {
        super::TargetCommands::List => {
            for name in store.list()? {
                println!("{}", name);
            }
            Ok(())
        }
        super::TargetCommands::Upgradable { name } => {
            require_target(&sandbox, name)?;
            zypper_in_target(config, &sandbox, name, &["list-updates"], &[])
        }
        super::TargetCommands::Install {
            name,
            toolchain,
            url,
            jfdi,
        } => {
            store.install(name, toolchain, url, *jfdi).await?;
            println!("Target {} installed", style(name.as_str()).bold());
            Ok(())
        }
        super::TargetCommands::Remove { name } => {
            store.remove(name)?;
            println!("Target {} removed", style(name.as_str()).bold());
            Ok(())
        }
        super::TargetCommands::Refresh { all, names } => {
            let selected = if *all {
                store.list()?
            } else if names.is_empty() {
                return Err(SdkError::usage(
                    "target refresh needs --all or at least one target name",
                ));
            } else {
                names.clone()
            };

            for name in &selected {
                require_target(&sandbox, name)?;
                info!("refreshing target {}", name);
                zypper_in_target(config, &sandbox, name, &["refresh"], &[])?;
            }
            Ok(())
        }
        super::TargetCommands::Update { name } => {
            require_target(&sandbox, name)?;
            zypper_in_target(config, &sandbox, name, &["update"], &[])
        }
        super::TargetCommands::Sync { name } => {
            let stats = store.synchronize(name)?;
            println!(
                "Mirror of {} refreshed ({} copied, {} deleted)",
                style(name.as_str()).bold(),
                stats.copied,
                stats.deleted
            );
            Ok(())
        }
        super::TargetCommands::Import { name } => {
            let stats = store.import(name)?;
            println!(
                "Target {} imported from mirror ({} copied, {} deleted)",
                style(name.as_str()).bold(),
                stats.copied,
                stats.deleted
            );
            Ok(())
        }
    }
}

/// Execute a devel-package subcommand
pub async fn execute_devel(config: &Config, command: &super::DevelCommands) -> Result<()> {
    let sandbox = Scratchbox2::new(config)?;

    match command {
        super::DevelCommands::List { target, search } => {
            require_target(&sandbox, target)?;
            let mut args = vec!["search", "--details"];
            if let Some(pattern) = search {
                args.push(pattern);
            }
            zypper_in_target(config, &sandbox, target, &args, &[ZYPPER_NO_MATCHES])
        }
        super::DevelCommands::Install { target, packages } => {
            require_target(&sandbox, target)?;
            let mut args = vec!["install", "--auto-agree-with-licenses"];
            args.extend(packages.iter().map(String::as_str));
            zypper_in_target(config, &sandbox, target, &args, &[])
        }
        super::DevelCommands::Remove { target, packages } => {
            require_target(&sandbox, target)?;
            let mut args = vec!["remove"];
            args.extend(packages.iter().map(String::as_str));
            zypper_in_target(config, &sandbox, target, &args, &[])
        }
    }
}

/// Execute an sdk subcommand
pub async fn execute_sdk(config: &Config, command: &super::SdkCommands) -> Result<()> {
    let zypper = Zypper::new(&config.tools.zypper);

    match command {
        super::SdkCommands::Version => {
            println!("{} {}", crate::NAME, crate::VERSION);
            match std::fs::read_to_string(&config.sdk.release_file) {
                Ok(release) => print!("{}", release),
                Err(e) => println!(
                    "No release information ({}: {})",
                    config.sdk.release_file.display(),
                    e
                ),
            }
            Ok(())
        }
        super::SdkCommands::Refresh => zypper.refresh(),
        super::SdkCommands::Upgradable => {
            let updates = zypper.list_updates(None)?;
            if updates.is_empty() {
                println!("SDK is up to date");
            }
            for name in updates {
                println!("{}", name);
            }
            Ok(())
        }
        super::SdkCommands::Upgrade => zypper.dist_upgrade(),
        super::SdkCommands::Status => {
            let vm = VBoxGuest::new(&config.tools.vboxcontrol);
            let missing = vm.missing_shares(&config.sdk.expected_shares)?;
            if missing.is_empty() {
                println!("{} SDK is in working order", style("✓").green());
                Ok(())
            } else {
                for name in &missing {
                    println!("{} shared folder {:?} is not configured", style("✗").red(), name);
                }
                Err(SdkError::Vm(format!(
                    "{} expected shared folder(s) missing",
                    missing.len()
                )))
            }
        }
    }
}

/// Execute the refresh-all composite: every target, then the SDK
pub async fn execute_refresh_all(config: &Config) -> Result<()> {
    let zypper = Zypper::new(&config.tools.zypper);
    let fetcher = HttpFetcher::new(&config.network)?;
    let sandbox = Scratchbox2::new(config)?;
    let ide = SdkToolNotifier::new(&config.tools);
    let store = TargetStore::new(config, &zypper, &fetcher, &sandbox, &ide);

    for name in store.list()? {
        info!("refreshing target {}", name);
        zypper_in_target(config, &sandbox, &name, &["refresh"], &[])?;
    }

    zypper.refresh()
}

/// Fail early when the named target has no sandbox configuration
fn require_target(sandbox: &Scratchbox2, name: &TargetName) -> Result<()> {
    if sandbox.config_exists(name) {
        Ok(())
    } else {
        Err(SdkError::NotInstalled(name.to_string()))
    }
}

/// Run the package manager inside a target through the sandbox
fn zypper_in_target(
    config: &Config,
    sandbox: &Scratchbox2,
    name: &TargetName,
    args: &[&str],
    ok_codes: &[i32],
) -> Result<()> {
    let mut argv = vec![config.tools.zypper.as_str(), "--non-interactive"];
    argv.extend_from_slice(args);

    let code = sandbox.run_in_target(name, &argv)?;
    if code == 0 || ok_codes.contains(&code) {
        Ok(())
    } else {
        Err(SdkError::External {
            tool: format!("{} (in target {})", config.tools.zypper, name),
            code,
        })
    }
}
