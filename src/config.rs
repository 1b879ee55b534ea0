//! Configuration management for sdkctl
//!
//! The dispatcher deliberately carries no ambient state: storage roots, the
//! unprivileged operating user and all external tool names travel in a
//! [`Config`] value handed to each operation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Operating identity settings
    #[serde(default)]
    pub operator: OperatorConfig,

    /// External tool names/paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// SDK-level settings
    #[serde(default)]
    pub sdk: SdkConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Storage locations for targets and their mirrors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Private storage root holding the full sysroot of every target
    pub target_root: PathBuf,
    /// Host-visible root holding the filtered mirror of every target
    pub mirror_root: PathBuf,
}

/// The unprivileged identity owning target trees and sandbox configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// User name that target directories are chowned to after creation.
    /// `None` skips the ownership transfer (useful outside the SDK VM).
    pub user: Option<String>,
    /// Home directory of the operating user; sandbox configs live under
    /// `<home>/.scratchbox2`. Derived from the user database when unset.
    pub home: Option<PathBuf>,
}

/// Names of the external tools the dispatcher orchestrates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Host package manager
    pub zypper: String,
    /// Sandbox entry tool
    pub sb2: String,
    /// Sandbox per-target initializer
    pub sb2_init: String,
    /// IDE-notification tool
    pub sdktool: String,
    /// Shared XML descriptor handed to the IDE-notification tool
    pub sdktool_descriptor: PathBuf,
    /// VM guest-properties tool
    pub vboxcontrol: String,
    /// Machine-id generator run for freshly installed targets
    pub uuidgen: String,
}

/// SDK-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Release information file printed by `sdk version`
    pub release_file: PathBuf,
    /// Package-name pattern matching installable cross-toolchains
    pub toolchain_pattern: String,
    /// Shared-folder names that must be configured on the VM for the SDK
    /// to be considered healthy
    pub expected_shares: Vec<String>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP timeout in seconds
    pub timeout: u64,
    /// Use proxy
    pub proxy: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            target_root: PathBuf::from("/srv/sdk/targets"),
            mirror_root: PathBuf::from("/host_targets"),
        }
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            user: Some("sdkuser".to_string()),
            home: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            zypper: "zypper".to_string(),
            sb2: "sb2".to_string(),
            sb2_init: "sb2-init".to_string(),
            sdktool: "sdktool".to_string(),
            sdktool_descriptor: PathBuf::from("/etc/sdk/targets.xml"),
            vboxcontrol: "VBoxControl".to_string(),
            uuidgen: "dbus-uuidgen".to_string(),
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            release_file: PathBuf::from("/etc/os-release"),
            toolchain_pattern: "sdk-toolchain-*".to_string(),
            expected_shares: vec![
                "home".to_string(),
                "targets".to_string(),
                "config".to_string(),
            ],
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            proxy: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SdkError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("sdkctl").join("config.toml"))
    }

    /// Load configuration from an explicit file, or from the default path
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p.clone(),
            None => Self::config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Home directory of the operating user, from config or the user database
    pub fn operator_home(&self) -> Result<PathBuf> {
        if let Some(ref home) = self.operator.home {
            return Ok(home.clone());
        }

        let user = self.operator.user.as_deref().ok_or_else(|| {
            SdkError::Config("No operating user configured and no home override set".into())
        })?;

        let entry = nix::unistd::User::from_name(user)
            .map_err(|e| SdkError::Config(format!("User lookup for {:?} failed: {}", user, e)))?
            .ok_or_else(|| SdkError::Config(format!("Unknown operating user: {:?}", user)))?;

        Ok(entry.dir)
    }

    /// Directory holding per-target sandbox configurations
    pub fn sandbox_config_root(&self) -> Result<PathBuf> {
        Ok(self.operator_home()?.join(".scratchbox2"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.target_root, PathBuf::from("/srv/sdk/targets"));
        assert_eq!(config.network.timeout, 30);
        assert_eq!(config.sdk.expected_shares.len(), 3);
    }

    #[test]
    fn test_home_override_wins() {
        let mut config = Config::default();
        config.operator.home = Some(PathBuf::from("/home/sdkuser"));
        assert_eq!(
            config.sandbox_config_root().unwrap(),
            PathBuf::from("/home/sdkuser/.scratchbox2")
        );
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.tools.zypper, "zypper");
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.storage.target_root = PathBuf::from("/tmp/t");
        config.operator.user = None;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.storage.target_root, PathBuf::from("/tmp/t"));
        assert!(loaded.operator.user.is_none());
    }
}
