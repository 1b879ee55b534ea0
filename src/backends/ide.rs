//! IDE-notification tool integration
//!
//! The host IDE keeps its own list of targets in a shared XML descriptor.
//! The `sdktool` utility updates it; notifications are fire-and-forget, a
//! missing or broken tool never fails the lifecycle operation.

use std::path::PathBuf;
use std::process::Command;

use tracing::warn;

use super::IdeNotifier;
use crate::config::ToolsConfig;
use crate::models::TargetName;

/// Notifier shelling out to the `sdktool` utility
pub struct SdkToolNotifier {
    program: String,
    descriptor: PathBuf,
}

impl SdkToolNotifier {
    /// Create a notifier from the tool configuration
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            program: tools.sdktool.clone(),
            descriptor: tools.sdktool_descriptor.clone(),
        }
    }

    fn notify(&self, name: &TargetName, action: &str) {
        let result = Command::new(&self.program)
            .arg(action)
            .arg("--target")
            .arg(name.as_str())
            .arg("--descriptor")
            .arg(&self.descriptor)
            .status();

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(
                "{} {} for target {} exited with {}",
                self.program, action, name, status
            ),
            Err(e) => warn!("could not run {}: {}", self.program, e),
        }
    }
}

impl IdeNotifier for SdkToolNotifier {
    fn target_added(&self, name: &TargetName) {
        self.notify(name, "--add");
    }

    fn target_removed(&self, name: &TargetName) {
        self.notify(name, "--delete");
    }
}
