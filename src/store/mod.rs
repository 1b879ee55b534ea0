//! Target lifecycle operations
//!
//! A target is a named sysroot with four on-disk footprints: the full tree
//! under the private storage root, a filtered mirror under the host-visible
//! root, a sandbox configuration directory, and an entry in the IDE's
//! descriptor. [`TargetStore`] owns the lifecycle: `install` creates all
//! four, `remove` destroys them, `synchronize`/`import` refresh content in
//! either direction. A failed install never leaves a half-created target
//! behind.

use std::fs::File;
use std::path::Path;
use std::process::Command;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::backends::{ArchiveFetcher, IdeNotifier, PackageBackend};
use crate::config::Config;
use crate::error::{Result, SdkError};
use crate::mirror::{SyncFilter, SyncStats};
use crate::models::{TargetName, TargetPaths, ToolchainArch};
use crate::sandbox::SandboxManager;

/// CRUD-style lifecycle manager over named targets
pub struct TargetStore<'a, P, F, S, N>
where
    P: PackageBackend,
    F: ArchiveFetcher,
    S: SandboxManager,
    N: IdeNotifier,
{
    config: &'a Config,
    packages: &'a P,
    fetcher: &'a F,
    sandbox: &'a S,
    ide: &'a N,
}

impl<'a, P, F, S, N> TargetStore<'a, P, F, S, N>
where
    P: PackageBackend,
    F: ArchiveFetcher,
    S: SandboxManager,
    N: IdeNotifier,
{
    /// Create a store over the given capabilities
    pub fn new(config: &'a Config, packages: &'a P, fetcher: &'a F, sandbox: &'a S, ide: &'a N) -> Self {
        Self {
            config,
            packages,
            fetcher,
            sandbox,
            ide,
        }
    }

    /// Install (or fully replace) the target `name` from `source`, using
    /// `toolchain` to parametrize the sandbox.
    pub async fn install(
        &self,
        name: &TargetName,
        toolchain: &str,
        source: &str,
        skip_toolchain_check: bool,
    ) -> Result<()> {
        // Resolved before any filesystem work so an unrecognized toolchain
        // name leaves nothing behind.
        let arch = ToolchainArch::from_toolchain_name(toolchain)?;

        if skip_toolchain_check {
            info!("skipping toolchain check for {}", toolchain);
        } else {
            self.ensure_toolchain(toolchain)?;
        }

        let work_dir = tempfile::tempdir()?;
        let archive = self.fetcher.fetch(source, work_dir.path()).await?;

        let paths = TargetPaths::resolve(self.config, name)?;
        if let Err(e) = self.unpack(&archive.path, &paths) {
            self.discard_partial(name, &paths);
            return Err(e);
        }

        if archive.downloaded {
            if let Err(e) = std::fs::remove_file(&archive.path) {
                warn!("could not delete downloaded archive: {}", e);
            }
        }

        if let Err(e) = self.finalize(name, &paths, arch) {
            self.discard_partial(name, &paths);
            return Err(e);
        }

        self.ide.target_added(name);
        info!("target {} installed", name);
        Ok(())
    }

    /// Refresh the host-visible mirror of `name` from its private sysroot
    pub fn synchronize(&self, name: &TargetName) -> Result<SyncStats> {
        let paths = TargetPaths::resolve(self.config, name)?;
        if !paths.sysroot.is_dir() {
            return Err(SdkError::NotInstalled(name.to_string()));
        }
        SyncFilter::target_rules()?.sync(&paths.sysroot, &paths.mirror)
    }

    /// Copy the host-visible mirror of `name` back into its private sysroot
    pub fn import(&self, name: &TargetName) -> Result<SyncStats> {
        let paths = TargetPaths::resolve(self.config, name)?;
        if !paths.mirror.is_dir() {
            return Err(SdkError::NotInstalled(name.to_string()));
        }
        let stats = SyncFilter::allow_all()?.sync(&paths.mirror, &paths.sysroot)?;
        self.chown_to_operator(&paths.sysroot)?;
        Ok(stats)
    }

    /// Remove the target `name` entirely
    pub fn remove(&self, name: &TargetName) -> Result<()> {
        if !self.sandbox.config_exists(name) {
            return Err(SdkError::NotInstalled(name.to_string()));
        }

        let paths = TargetPaths::resolve(self.config, name)?;
        self.sandbox.remove_config(name)?;

        // Data directories go best-effort; a mirror already gone is fine.
        for dir in [&paths.sysroot, &paths.mirror] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("could not delete {}: {}", dir.display(), e),
            }
        }

        self.ide.target_removed(name);
        info!("target {} removed", name);
        Ok(())
    }

    /// Names of the targets present under the private storage root
    pub fn list(&self) -> Result<Vec<TargetName>> {
        let root = &self.config.storage.target_root;
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(name) = TargetName::new(entry.file_name().to_string_lossy()) {
                names.push(name);
            }
        }
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    /// Make sure the toolchain package is installed, installing it on demand
    fn ensure_toolchain(&self, toolchain: &str) -> Result<()> {
        if self.packages.is_installed(toolchain)? {
            return Ok(());
        }
        info!("toolchain {} not present, installing", toolchain);
        self.packages.install(toolchain)
    }

    /// Recreate the private sysroot directory and extract the archive into it
    fn unpack(&self, archive: &Path, paths: &TargetPaths) -> Result<()> {
        if paths.sysroot.exists() {
            std::fs::remove_dir_all(&paths.sysroot)?;
        }
        std::fs::create_dir_all(&paths.sysroot)?;

        info!("unpacking {} into {}", archive.display(), paths.sysroot.display());
        extract_archive(archive, &paths.sysroot).map_err(|e| self.classify_unpack_error(archive, e))
    }

    /// Distinguish a full filesystem from a genuinely broken archive
    fn classify_unpack_error(&self, archive: &Path, err: SdkError) -> SdkError {
        let required = archive.metadata().map(|m| m.len()).unwrap_or(0);
        let root = &self.config.storage.target_root;
        match fs4::available_space(root) {
            Ok(available) if available < required => SdkError::DiskSpace {
                path: root.clone(),
                available,
                required,
            },
            _ => err,
        }
    }

    /// Post-extraction steps: ownership, mirror, sandbox, machine id
    fn finalize(&self, name: &TargetName, paths: &TargetPaths, arch: ToolchainArch) -> Result<()> {
        self.chown_to_operator(&paths.sysroot)?;

        SyncFilter::target_rules()?.sync(&paths.sysroot, &paths.mirror)?;

        self.sandbox.init_target(name, &paths.sysroot, arch)?;
        self.generate_machine_id(&paths.sysroot);
        self.sandbox.validate_config(name)?;

        Ok(())
    }

    /// Remove whatever a failed install left behind
    fn discard_partial(&self, name: &TargetName, paths: &TargetPaths) {
        for dir in [&paths.sysroot, &paths.mirror] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("cleanup of {} failed: {}", dir.display(), e),
            }
        }
        if self.sandbox.config_exists(name) {
            if let Err(e) = self.sandbox.remove_config(name) {
                warn!("cleanup of sandbox config failed: {}", e);
            }
        }
    }

    /// Hand the tree to the unprivileged operating user, when one is set
    fn chown_to_operator(&self, root: &Path) -> Result<()> {
        let Some(ref user) = self.config.operator.user else {
            return Ok(());
        };

        let entry = nix::unistd::User::from_name(user)
            .map_err(|e| SdkError::Config(format!("User lookup for {:?} failed: {}", user, e)))?
            .ok_or_else(|| SdkError::Config(format!("Unknown operating user: {:?}", user)))?;

        for item in WalkDir::new(root).follow_links(false) {
            let item = match item {
                Ok(i) => i,
                Err(e) => {
                    warn!("skipping unreadable entry during chown: {}", e);
                    continue;
                }
            };
            if let Err(e) = nix::unistd::fchownat(
                None,
                item.path(),
                Some(entry.uid),
                Some(entry.gid),
                nix::unistd::FchownatFlags::NoFollowSymlink,
            ) {
                warn!("could not chown {}: {}", item.path().display(), e);
            }
        }

        Ok(())
    }

    /// Give the new target a fresh machine identifier. Failures are logged
    /// and never fail the install.
    fn generate_machine_id(&self, sysroot: &Path) {
        let tool = &self.config.tools.uuidgen;
        let id = match Command::new(tool).output() {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(output) => {
                warn!("{} exited with {}; machine id not regenerated", tool, output.status);
                return;
            }
            Err(e) => {
                warn!("could not run {}: {}; machine id not regenerated", tool, e);
                return;
            }
        };

        let etc = sysroot.join("etc");
        let result = std::fs::create_dir_all(&etc)
            .and_then(|_| std::fs::write(etc.join("machine-id"), format!("{}\n", id)));
        if let Err(e) = result {
            warn!("could not write machine id: {}", e);
        }
    }
}

/// Extract a rootfs tarball, picking the decompressor from the file name
fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let name = archive.to_string_lossy();

    let unpack = |a: &mut tar::Archive<Box<dyn std::io::Read>>| -> std::io::Result<()> {
        a.set_preserve_permissions(true);
        a.unpack(dest)
    };

    let reader: Box<dyn std::io::Read> = if name.ends_with(".gz") || name.ends_with(".tgz") {
        Box::new(flate2::read::GzDecoder::new(file))
    } else if name.ends_with(".bz2") || name.ends_with(".tbz2") {
        Box::new(bzip2::read::BzDecoder::new(file))
    } else if name.ends_with(".xz") {
        Box::new(xz2::read::XzDecoder::new(file))
    } else if name.ends_with(".zst") {
        Box::new(zstd::Decoder::new(file).map_err(|e| SdkError::UnpackFailed(e.to_string()))?)
    } else {
        Box::new(file)
    };

    let mut tarball = tar::Archive::new(reader);
    unpack(&mut tarball).map_err(|e| SdkError::UnpackFailed(e.to_string()))
}
