//! Sdkctl - administrative dispatcher for a VM-based cross-compilation SDK
//!
//! Main entry point for the sdkctl CLI application.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use console::style;
use tracing_subscriber::EnvFilter;

use sdkctl::cli::{self, Cli, Commands};
use sdkctl::config::Config;
use sdkctl::error::Result;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments; the dispatcher contract fixes exit code 1 for
    // usage errors, so clap's own exit (2) is not used.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{}", e);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprint!("{}", e);
            return ExitCode::from(1);
        }
    };

    // Set up logging
    setup_logging(&cli);

    // Everything here drives privileged tools; re-execute under sudo when
    // invoked by an unprivileged operator. sudo records the invoking user
    // in SUDO_USER, which the configuration falls back to.
    if !nix::unistd::Uid::effective().is_root() {
        return reexec_elevated();
    }

    // Run the application
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Set up logging based on CLI arguments
fn setup_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Replace this process with an elevated copy of itself
fn reexec_elevated() -> ExitCode {
    use std::os::unix::process::CommandExt;

    let err = std::process::Command::new("sudo")
        .args(std::env::args())
        .exec();

    eprintln!(
        "{} elevation required but sudo could not be run: {}",
        style("Error:").red().bold(),
        err
    );
    ExitCode::from(1)
}

/// Main application logic
async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_ref())?;

    // The elevated process acts on behalf of whoever invoked it.
    if config.operator.user.is_none() {
        if let Ok(user) = std::env::var("SUDO_USER") {
            config.operator.user = Some(user);
        }
    }

    match cli.command {
        Commands::Toolchain { command } => cli::execute_toolchain(&config, &command).await,
        Commands::Target { command } => cli::execute_target(&config, &command).await,
        Commands::Devel { command } => cli::execute_devel(&config, &command).await,
        Commands::Sdk { command } => cli::execute_sdk(&config, &command).await,
        Commands::RefreshAll => cli::execute_refresh_all(&config).await,
    }
}
