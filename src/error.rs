//! Error types for sdkctl

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sdkctl operations
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Invalid target name: {0:?} (allowed: letters, digits, '-', '_', '.')")]
    InvalidName(String),

    #[error("{0}")]
    Usage(String),

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("{0} is already installed")]
    AlreadyInstalled(String),

    #[error("Invalid toolchain: {0}")]
    Toolchain(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Failed to unpack archive: {0}")]
    UnpackFailed(String),

    #[error("Failed to unpack archive: insufficient free space on {path} ({available} bytes available, archive is {required} bytes)")]
    DiskSpace {
        path: PathBuf,
        available: u64,
        required: u64,
    },

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Package backend error: {0}")]
    Package(String),

    #[error("{tool} exited with status {code}")]
    External { tool: String, code: i32 },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("VM integration error: {0}")]
    Vm(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sdkctl operations
pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a sandbox error
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::Sandbox(msg.into())
    }

    /// Create a package backend error
    pub fn package(msg: impl Into<String>) -> Self {
        Self::Package(msg.into())
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Map this error onto the dispatcher's process exit code.
    ///
    /// 1 usage/validation, 2 precondition not met, 3 download failure,
    /// 4 extraction failure; external tool failures surface the tool's own
    /// exit code, everything else is a generic 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::InvalidName(_) => 1,
            Self::NotInstalled(_) | Self::AlreadyInstalled(_) | Self::Toolchain(_) => 2,
            Self::DownloadFailed(_) => 3,
            Self::UnpackFailed(_) | Self::DiskSpace { .. } => 4,
            Self::External { code, .. } => (*code).clamp(1, 255) as u8,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SdkError::usage("bad arguments").exit_code(), 1);
        assert_eq!(SdkError::InvalidName("a b".into()).exit_code(), 1);
        assert_eq!(SdkError::NotInstalled("alpha".into()).exit_code(), 2);
        assert_eq!(SdkError::Toolchain("weird-name".into()).exit_code(), 2);
        assert_eq!(SdkError::DownloadFailed("too small".into()).exit_code(), 3);
        assert_eq!(SdkError::UnpackFailed("bad tar".into()).exit_code(), 4);
        assert_eq!(
            SdkError::External {
                tool: "zypper".into(),
                code: 104
            }
            .exit_code(),
            104
        );
    }

    #[test]
    fn test_disk_space_message_mentions_space() {
        let err = SdkError::DiskSpace {
            path: PathBuf::from("/srv/targets"),
            available: 42,
            required: 1000,
        };
        assert!(err.to_string().contains("insufficient free space"));
        assert_eq!(err.exit_code(), 4);
    }
}
