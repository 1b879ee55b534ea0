//! Scratchbox2 sandbox implementation

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::SandboxManager;
use crate::config::Config;
use crate::error::{Result, SdkError};
use crate::models::{TargetName, ToolchainArch};

/// Sandbox driving the scratchbox2 toolset.
///
/// Per-target configuration lives under the operating user's
/// `.scratchbox2/<name>/` directory; both `sb2-init` and `sb2` must run as
/// that user, never as root.
pub struct Scratchbox2 {
    config_root: PathBuf,
    operator: Option<String>,
    sb2: String,
    sb2_init: String,
}

impl Scratchbox2 {
    /// Create a sandbox manager from the configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            config_root: config.sandbox_config_root()?,
            operator: config.operator.user.clone(),
            sb2: config.tools.sb2.clone(),
            sb2_init: config.tools.sb2_init.clone(),
        })
    }

    /// Construct directly from parts; used by tests
    pub fn with_parts(
        config_root: impl Into<PathBuf>,
        operator: Option<String>,
        sb2: impl Into<String>,
        sb2_init: impl Into<String>,
    ) -> Self {
        Self {
            config_root: config_root.into(),
            operator,
            sb2: sb2.into(),
            sb2_init: sb2_init.into(),
        }
    }

    /// Configuration directory for `name`
    pub fn config_dir(&self, name: &TargetName) -> PathBuf {
        self.config_root.join(name)
    }

    /// Configuration file whose presence marks `name` as installed
    pub fn config_file(&self, name: &TargetName) -> PathBuf {
        self.config_dir(name).join("sb2.config")
    }

    /// Build a command for `program`, demoted to the operating user when
    /// one is configured
    fn user_command(&self, program: &str) -> Command {
        match self.operator {
            Some(ref user) => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-u").arg(user).arg(program);
                cmd
            }
            None => Command::new(program),
        }
    }
}

impl SandboxManager for Scratchbox2 {
    fn init_target(&self, name: &TargetName, sysroot: &Path, arch: ToolchainArch) -> Result<()> {
        let mut cmd = self.user_command(&self.sb2_init);
        cmd.current_dir(sysroot);
        cmd.args(["-m", "sdk-build", "-n", "-N"]);
        if let Some(emulator) = arch.emulator() {
            cmd.args(["-c", emulator]);
        }
        cmd.args(["-t", arch.toolsdir()]);
        cmd.arg(name.as_str());
        cmd.arg(arch.compiler());

        debug!("initializing sandbox for {} ({})", name, arch);
        let status = cmd.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(SdkError::External {
                tool: self.sb2_init.clone(),
                code: status.code().unwrap_or(-1),
            })
        }
    }

    fn config_exists(&self, name: &TargetName) -> bool {
        self.config_file(name).is_file()
    }

    fn validate_config(&self, name: &TargetName) -> Result<()> {
        let path = self.config_file(name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SdkError::sandbox(format!(
                "sandbox config for {:?} is not loadable ({}): {}",
                name.as_str(),
                path.display(),
                e
            ))
        })?;

        if content.trim().is_empty() {
            return Err(SdkError::sandbox(format!(
                "sandbox config for {:?} is empty",
                name.as_str()
            )));
        }

        Ok(())
    }

    fn remove_config(&self, name: &TargetName) -> Result<()> {
        let dir = self.config_dir(name);
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    fn run_in_target(&self, name: &TargetName, argv: &[&str]) -> Result<i32> {
        let mut cmd = self.user_command(&self.sb2);
        cmd.args(["-t", name.as_str(), "-m", "sdk-install", "-R"]);
        cmd.args(argv);

        debug!("sb2 -t {}: {}", name, argv.join(" "));
        let status = cmd.status()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn run_in_target_capture(&self, name: &TargetName, argv: &[&str]) -> Result<String> {
        let mut cmd = self.user_command(&self.sb2);
        cmd.args(["-t", name.as_str(), "-m", "sdk-install", "-R"]);
        cmd.args(argv);

        let output = cmd.output()?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(SdkError::External {
                tool: self.sb2.clone(),
                code: output.status.code().unwrap_or(-1),
            })
        }
    }
}
