//! VM host-integration tool
//!
//! The SDK runs inside a VM whose host mounts a handful of shared folders.
//! `sdk status` asks the guest tool which folders are configured and checks
//! the expected set is present.

use std::process::Command;

use crate::error::{Result, SdkError};

/// Guest-properties client shelling out to `VBoxControl`
pub struct VBoxGuest {
    program: String,
}

impl VBoxGuest {
    /// Create a client using the given control binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Names of the shared folders configured on the VM
    pub fn shared_folders(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .args(["sharedfolder", "list", "--automount"])
            .output()
            .map_err(|e| SdkError::Vm(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SdkError::External {
                tool: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
            });
        }

        Ok(parse_shared_folders(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Shared-folder names from `expected` that the VM does not provide
    pub fn missing_shares(&self, expected: &[String]) -> Result<Vec<String>> {
        let present = self.shared_folders()?;
        Ok(expected
            .iter()
            .filter(|name| !present.iter().any(|p| p == *name))
            .cloned()
            .collect())
    }
}

/// Parse `VBoxControl sharedfolder list` output.
///
/// Folder lines look like `01 - home` after a header line; everything else
/// is banner noise.
fn parse_shared_folders(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (index, name) = line.split_once(" - ")?;
            if index.chars().all(|c| c.is_ascii_digit()) && !name.is_empty() {
                Some(name.trim().to_string())
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_OUTPUT: &str = "\
Oracle VM VirtualBox Guest Additions Command Line Management Interface
(C) 2009-2020 Oracle Corporation

Auto-mounted Shared Folder mappings (3):

01 - home
02 - targets
03 - config
";

    #[test]
    fn test_parse_shared_folders() {
        assert_eq!(parse_shared_folders(LIST_OUTPUT), vec!["home", "targets", "config"]);
    }

    #[test]
    fn test_parse_ignores_banner_noise() {
        assert!(parse_shared_folders("No shared folders available.\n").is_empty());
    }
}
