//! External tool backends
//!
//! Every operation sdkctl performs is ultimately a call into some external
//! tool: the package manager, the archive fetcher, the IDE-notification
//! tool, the VM guest tool. Each is modeled as a small capability trait so
//! the lifecycle code can be exercised against fakes.

mod fetch;
mod ide;
mod vm;
mod zypper;

pub use fetch::{HttpFetcher, MIN_ARCHIVE_SIZE};
pub use ide::SdkToolNotifier;
pub use vm::VBoxGuest;
pub use zypper::Zypper;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::TargetName;

/// A package-like unit as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name
    pub name: String,
    /// Version, when the backend reports one
    pub version: Option<String>,
    /// Whether the package is currently installed
    pub installed: bool,
}

/// The system package manager
pub trait PackageBackend {
    /// Whether `pkg` is currently installed
    fn is_installed(&self, pkg: &str) -> Result<bool>;

    /// List installed and installable packages matching `pattern`
    fn list(&self, pattern: &str) -> Result<Vec<PackageInfo>>;

    /// Install a package
    fn install(&self, pkg: &str) -> Result<()>;

    /// Remove a package
    fn remove(&self, pkg: &str) -> Result<()>;

    /// Refresh package metadata
    fn refresh(&self) -> Result<()>;

    /// List pending updates, optionally restricted to `pattern`
    fn list_updates(&self, pattern: Option<&str>) -> Result<Vec<String>>;

    /// Apply a full distribution upgrade
    fn dist_upgrade(&self) -> Result<()>;
}

/// Resolves a source reference into a local archive file
pub trait ArchiveFetcher {
    /// Resolve `source` into a path on disk.
    ///
    /// Local references (`file://` or a plain path) are returned as-is with
    /// `downloaded = false`; anything else is fetched into `work_dir`.
    fn fetch(
        &self,
        source: &str,
        work_dir: &Path,
    ) -> impl std::future::Future<Output = Result<FetchedArchive>> + Send;
}

/// Result of resolving a source reference
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    /// Local archive path
    pub path: PathBuf,
    /// True when the archive was downloaded and should be deleted after use
    pub downloaded: bool,
}

/// Fire-and-forget notifications towards the IDE-integration tool
pub trait IdeNotifier {
    /// Announce a new or replaced target
    fn target_added(&self, name: &TargetName);

    /// Announce a deleted target
    fn target_removed(&self, name: &TargetName);
}
