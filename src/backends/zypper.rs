//! Zypper package backend
//!
//! Thin orchestration over the `zypper` CLI. Nothing here retries or
//! reinterprets failures; exit codes are surfaced to the dispatcher.

use std::process::Command;

use tracing::debug;

use super::{PackageBackend, PackageInfo};
use crate::error::{Result, SdkError};

/// zypper's "no matches" exit code for search
const ZYPPER_NO_MATCHES: i32 = 104;

/// Package backend shelling out to zypper
pub struct Zypper {
    program: String,
}

impl Zypper {
    /// Create a backend using the given zypper binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run zypper, forwarding output to the terminal
    fn run(&self, args: &[&str]) -> Result<()> {
        debug!("running {} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .arg("--non-interactive")
            .args(args)
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(SdkError::External {
                tool: self.program.clone(),
                code: status.code().unwrap_or(-1),
            })
        }
    }

    /// Run zypper and capture stdout; `ok_codes` are treated as success
    fn capture(&self, args: &[&str], ok_codes: &[i32]) -> Result<(i32, String)> {
        debug!("running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .arg("--non-interactive")
            .args(args)
            .output()?;

        let code = output.status.code().unwrap_or(-1);
        if output.status.success() || ok_codes.contains(&code) {
            Ok((code, String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            Err(SdkError::External {
                tool: self.program.clone(),
                code,
            })
        }
    }
}

impl PackageBackend for Zypper {
    fn is_installed(&self, pkg: &str) -> Result<bool> {
        let (code, _) = self.capture(
            &["search", "--installed-only", "--match-exact", pkg],
            &[ZYPPER_NO_MATCHES],
        )?;
        Ok(code != ZYPPER_NO_MATCHES)
    }

    fn list(&self, pattern: &str) -> Result<Vec<PackageInfo>> {
        let (code, stdout) =
            self.capture(&["search", "--details", pattern], &[ZYPPER_NO_MATCHES])?;
        if code == ZYPPER_NO_MATCHES {
            return Ok(Vec::new());
        }
        Ok(parse_search_output(&stdout))
    }

    fn install(&self, pkg: &str) -> Result<()> {
        self.run(&["install", "--auto-agree-with-licenses", pkg])
    }

    fn remove(&self, pkg: &str) -> Result<()> {
        self.run(&["remove", pkg])
    }

    fn refresh(&self) -> Result<()> {
        self.run(&["refresh"])
    }

    fn list_updates(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let (_, stdout) = self.capture(&["list-updates"], &[])?;
        let mut names = parse_update_output(&stdout);

        if let Some(pattern) = pattern {
            let glob = globset::Glob::new(pattern)
                .map_err(|e| SdkError::package(e.to_string()))?
                .compile_matcher();
            names.retain(|n| glob.is_match(n));
        }

        Ok(names)
    }

    fn dist_upgrade(&self) -> Result<()> {
        self.run(&["dist-upgrade", "--auto-agree-with-licenses"])
    }
}

/// Parse the table produced by `zypper search --details`.
///
/// Lines look like `i | gcc | package | 9.3.1 | x86_64 | repo-oss`; header
/// and separator lines carry no package name in the second column.
fn parse_search_output(stdout: &str) -> Vec<PackageInfo> {
    let mut packages = Vec::new();

    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 4 {
            continue;
        }
        let status = fields[0];
        let name = fields[1];
        if name.is_empty() || name == "Name" || !status.chars().all(|c| "iv+ .".contains(c)) {
            continue;
        }
        packages.push(PackageInfo {
            name: name.to_string(),
            version: fields.get(3).map(|v| v.to_string()).filter(|v| !v.is_empty()),
            installed: status.contains('i'),
        });
    }

    packages
}

/// Parse the table produced by `zypper list-updates`
fn parse_update_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            if fields.len() < 5 {
                return None;
            }
            let name = fields[2];
            if name.is_empty() || name == "Name" {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_OUTPUT: &str = "\
Loading repository data...
Reading installed packages...

S  | Name                  | Type    | Version | Arch   | Repository
---+-----------------------+---------+---------+--------+-----------
i  | sdk-toolchain-armv7hl | package | 1.4.2   | x86_64 | sdk
   | sdk-toolchain-i486    | package | 1.4.2   | x86_64 | sdk
v  | sdk-toolchain-any     | package | 1.4.0   | noarch | sdk
";

    const UPDATE_OUTPUT: &str = "\
S | Repository | Name                  | Current | Available | Arch
--+------------+-----------------------+---------+-----------+-------
v | sdk        | sdk-toolchain-armv7hl | 1.4.2   | 1.5.0     | x86_64
v | sdk        | curl                  | 7.66    | 7.68      | x86_64
";

    #[test]
    fn test_parse_search_output() {
        let packages = parse_search_output(SEARCH_OUTPUT);
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].name, "sdk-toolchain-armv7hl");
        assert!(packages[0].installed);
        assert_eq!(packages[0].version.as_deref(), Some("1.4.2"));
        assert!(!packages[1].installed);
    }

    #[test]
    fn test_parse_search_skips_header_and_noise() {
        assert!(parse_search_output("Loading repository data...\n").is_empty());
        assert!(parse_search_output("").is_empty());
    }

    #[test]
    fn test_parse_update_output() {
        let names = parse_update_output(UPDATE_OUTPUT);
        assert_eq!(names, vec!["sdk-toolchain-armv7hl", "curl"]);
    }
}
