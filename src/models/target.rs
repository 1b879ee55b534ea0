//! Target identity and on-disk layout

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Result, SdkError};

/// A validated target name.
///
/// Target names become path segments in four places (private storage root,
/// host-visible mirror root, sandbox config directory, IDE descriptor), so
/// validation rejects everything outside `[A-Za-z0-9_.-]` up front; there is
/// no recovery path for an invalid name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

impl TargetName {
    /// Validate and wrap a candidate name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        lazy_static::lazy_static! {
            static ref NAME_RE: Regex = Regex::new(r"^[-A-Za-z0-9_.]+$").unwrap();
        }

        let name = name.into();
        if NAME_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(SdkError::InvalidName(name))
        }
    }

    /// The validated name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TargetName {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TargetName {
    type Error = SdkError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TargetName> for String {
    fn from(name: TargetName) -> Self {
        name.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<std::path::Path> for TargetName {
    fn as_ref(&self) -> &std::path::Path {
        self.0.as_ref()
    }
}

/// The filesystem locations a target occupies
#[derive(Debug, Clone)]
pub struct TargetPaths {
    /// Full sysroot under the private storage root
    pub sysroot: PathBuf,
    /// Filtered host-visible mirror
    pub mirror: PathBuf,
    /// Sandbox configuration directory
    pub sandbox_config: PathBuf,
}

impl TargetPaths {
    /// Resolve all locations for `name` from the configuration
    pub fn resolve(config: &Config, name: &TargetName) -> Result<Self> {
        Ok(Self {
            sysroot: config.storage.target_root.join(name),
            mirror: config.storage.mirror_root.join(name),
            sandbox_config: config.sandbox_config_root()?.join(name),
        })
    }

    /// Path of the sandbox config file that marks the target as installed
    pub fn sandbox_config_file(&self) -> PathBuf {
        self.sandbox_config.join("sb2.config")
    }
}
