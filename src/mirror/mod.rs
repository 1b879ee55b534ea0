//! Filtered mirroring of target sysroots
//!
//! A target's full sysroot lives under the private storage root; the IDE on
//! the host only needs a small slice of it (headers, UI-toolkit imports,
//! shared data, one library for architecture detection). [`SyncFilter`]
//! mirrors that slice into the host-visible root and keeps the mirror
//! converged: anything no longer present or no longer matched in the source
//! is deleted from the destination.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Shared library kept in the mirror for architecture detection
const ARCH_DETECT_LIBRARY: &str = "usr/lib/libQt5Core.so*";

/// Stub executable the IDE expects to find in every mirror
const PLACEHOLDER_STUB: &str = "usr/bin/qmake";

/// Empty directory the IDE expects to find in every mirror
const PLACEHOLDER_DIR: &str = "usr/lib/qt5/plugins";

/// Whether a matching rule keeps or drops a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Include,
    Exclude,
}

/// One ordered filter rule
struct Rule {
    action: Action,
    matcher: GlobMatcher,
    /// Rule only applies to directories
    dirs_only: bool,
}

impl Rule {
    fn new(action: Action, pattern: &str, dirs_only: bool) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| crate::error::SdkError::Other(e.to_string()))?;
        Ok(Self {
            action,
            matcher: glob.compile_matcher(),
            dirs_only,
        })
    }
}

/// Counts reported by a completed sync
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncStats {
    /// Files and symlinks copied into the destination
    pub copied: usize,
    /// Stale destination entries deleted
    pub deleted: usize,
    /// Source entries skipped because they could not be read
    pub skipped: usize,
}

/// Ordered allow/deny rule list driving a one-way tree mirror.
///
/// Rules are evaluated per path, first match wins; a path matching no rule
/// is excluded.
pub struct SyncFilter {
    rules: Vec<Rule>,
    placeholders: bool,
}

impl SyncFilter {
    /// The fixed rule set for host-visible target mirrors, highest
    /// priority first:
    ///
    /// 1. every directory (tree shape is preserved even when filtered empty),
    /// 2. the architecture-detection library,
    /// 3. no other shared libraries,
    /// 4. UI-toolkit import trees, the include tree and the share tree,
    /// 5. nothing else.
    pub fn target_rules() -> Result<Self> {
        let rules = vec![
            Rule::new(Action::Include, "**", true)?,
            Rule::new(Action::Include, ARCH_DETECT_LIBRARY, false)?,
            Rule::new(Action::Exclude, "**/*.so*", false)?,
            Rule::new(Action::Include, "usr/lib/qt5/imports/**", false)?,
            Rule::new(Action::Include, "usr/lib/qt5/qml/**", false)?,
            Rule::new(Action::Include, "usr/include/**", false)?,
            Rule::new(Action::Include, "usr/share/**", false)?,
        ];
        Ok(Self {
            rules,
            placeholders: true,
        })
    }

    /// A rule set that mirrors everything; used for `import`, which copies a
    /// host-visible mirror back into the private storage root.
    pub fn allow_all() -> Result<Self> {
        Ok(Self {
            rules: vec![Rule::new(Action::Include, "**", false)?],
            placeholders: false,
        })
    }

    /// First-match-wins decision for a single relative path
    fn includes(&self, rel: &Path, is_dir: bool) -> bool {
        for rule in &self.rules {
            if rule.dirs_only && !is_dir {
                continue;
            }
            if rule.matcher.is_match(rel) {
                return rule.action == Action::Include;
            }
        }
        false
    }

    /// Mirror `src` into `dest` according to the rules.
    ///
    /// Unreadable source entries (dangling symlinks, permission holes) are
    /// logged and skipped rather than failing the whole sync. Destination
    /// entries not produced by this pass are deleted afterwards, which makes
    /// the operation idempotent and the mirror a strict subset of the source.
    pub fn sync(&self, src: &Path, dest: &Path) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        let mut kept: HashSet<PathBuf> = HashSet::new();

        fs::create_dir_all(dest)?;

        for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let rel = match entry.path().strip_prefix(src) {
                Ok(r) => r.to_path_buf(),
                Err(_) => continue,
            };
            let file_type = entry.file_type();

            if !self.includes(&rel, file_type.is_dir()) {
                continue;
            }

            let target = dest.join(&rel);
            let outcome = if file_type.is_dir() {
                fs::create_dir_all(&target).map(|_| false)
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target).map(|_| true)
            } else {
                copy_file(entry.path(), &target).map(|_| true)
            };

            match outcome {
                Ok(counted) => {
                    if counted {
                        stats.copied += 1;
                    }
                    // Ancestors survive pruning even when the rules never
                    // matched them as directories of their own.
                    keep_with_ancestors(&mut kept, &rel);
                }
                Err(e) => {
                    warn!("skipping {}: {}", rel.display(), e);
                    stats.skipped += 1;
                }
            }
        }

        if self.placeholders {
            // Placeholders are not part of the source tree but must never
            // be pruned away.
            keep_with_ancestors(&mut kept, Path::new(PLACEHOLDER_STUB));
            keep_with_ancestors(&mut kept, Path::new(PLACEHOLDER_DIR));
        }

        stats.deleted = prune(dest, &kept)?;

        if self.placeholders {
            ensure_placeholders(dest)?;
        }

        debug!(
            "sync {} -> {}: {} copied, {} deleted, {} skipped",
            src.display(),
            dest.display(),
            stats.copied,
            stats.deleted,
            stats.skipped
        );

        Ok(stats)
    }
}

/// Mark a relative path and all of its ancestors as kept
fn keep_with_ancestors(kept: &mut HashSet<PathBuf>, rel: &Path) {
    let mut anc = rel;
    loop {
        kept.insert(anc.to_path_buf());
        match anc.parent() {
            Some(p) if !p.as_os_str().is_empty() => anc = p,
            _ => break,
        }
    }
}

/// Copy a regular file, creating parent directories as needed
fn copy_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if dest.symlink_metadata().is_ok() {
        fs::remove_file(dest)?;
    }
    fs::copy(src, dest)?;
    Ok(())
}

/// Recreate a symlink in the destination without following it
fn copy_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    let link = fs::read_link(src)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if dest.symlink_metadata().is_ok() {
        fs::remove_file(dest)?;
    }
    std::os::unix::fs::symlink(link, dest)
}

/// Delete every destination path that the current pass did not produce.
/// Returns the number of entries removed.
fn prune(dest: &Path, kept: &HashSet<PathBuf>) -> Result<usize> {
    let mut deleted = 0;

    for entry in WalkDir::new(dest).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable mirror entry: {}", e);
                continue;
            }
        };

        let rel = match entry.path().strip_prefix(dest) {
            Ok(r) => r,
            Err(_) => continue,
        };

        if kept.contains(rel) {
            continue;
        }

        let result = if entry.file_type().is_dir() {
            fs::remove_dir_all(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        match result {
            Ok(()) => deleted += 1,
            // contents_first still reports children of a directory that was
            // just removed wholesale
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not delete {}: {}", rel.display(), e),
        }
    }

    Ok(deleted)
}

/// Create the two paths the IDE integration requires in every mirror,
/// whether or not the rules produced them: a stub executable and an empty
/// plugin directory.
pub fn ensure_placeholders(dest: &Path) -> Result<()> {
    fs::create_dir_all(dest.join(PLACEHOLDER_DIR))?;

    let stub = dest.join(PLACEHOLDER_STUB);
    if let Some(parent) = stub.parent() {
        fs::create_dir_all(parent)?;
    }
    if !stub.exists() {
        fs::write(&stub, "#!/bin/sh\nexit 0\n")?;
    }
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn tree(root: &Path) -> BTreeSet<String> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn sample_source() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "usr/lib/libQt5Core.so.5.6", "core");
        write(root, "usr/lib/libcrypto.so.1.1", "crypto");
        write(root, "usr/lib/qt5/imports/QtQuick/qmldir", "module QtQuick");
        write(root, "usr/lib/qt5/qml/QtQml/plugin.so", "qml plugin");
        write(root, "usr/include/stdio.h", "int printf();");
        write(root, "usr/share/icons/app.png", "png");
        write(root, "usr/bin/gcc", "elf");
        write(root, "etc/passwd", "root:x:0:0");
        dir
    }

    #[test]
    fn test_target_rules_keep_expected_slice() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();

        let mirror = tree(dest.path());
        assert!(mirror.contains("usr/lib/libQt5Core.so.5.6"));
        assert!(mirror.contains("usr/lib/qt5/imports/QtQuick/qmldir"));
        assert!(mirror.contains("usr/include/stdio.h"));
        assert!(mirror.contains("usr/share/icons/app.png"));
        // tree shape survives even where contents are filtered out
        assert!(mirror.contains("etc"));
        assert!(!mirror.contains("usr/lib/libcrypto.so.1.1"));
        assert!(!mirror.contains("usr/bin/gcc"));
        assert!(!mirror.contains("etc/passwd"));
    }

    #[test]
    fn test_shared_library_exclusion_beats_included_trees() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();

        // lives under an included tree, but the .so exclusion has priority
        assert!(!dest.path().join("usr/lib/qt5/qml/QtQml/plugin.so").exists());
    }

    #[test]
    fn test_placeholders_always_present() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();

        let stub = dest.path().join("usr/bin/qmake");
        assert!(stub.exists());
        assert_ne!(stub.metadata().unwrap().permissions().mode() & 0o111, 0);
        assert!(dest.path().join("usr/lib/qt5/plugins").is_dir());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();
        let first = tree(dest.path());

        let stats = filter.sync(src.path(), dest.path()).unwrap();
        assert_eq!(first, tree(dest.path()));
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn test_sync_converges_after_source_deletion() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();
        assert!(dest.path().join("usr/include/stdio.h").exists());

        fs::remove_file(src.path().join("usr/include/stdio.h")).unwrap();
        let stats = filter.sync(src.path(), dest.path()).unwrap();
        assert!(!dest.path().join("usr/include/stdio.h").exists());
        assert!(stats.deleted >= 1);
    }

    #[test]
    fn test_stale_mirror_entries_are_pruned() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();
        write(dest.path(), "usr/share/stale/file.txt", "old");

        let filter = SyncFilter::target_rules().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();

        assert!(!dest.path().join("usr/share/stale").exists());
    }

    #[test]
    fn test_dangling_symlink_does_not_abort() {
        let src = sample_source();
        std::os::unix::fs::symlink(
            "/nonexistent/destination",
            src.path().join("usr/share/broken-link"),
        )
        .unwrap();
        let dest = tempfile::tempdir().unwrap();

        let filter = SyncFilter::target_rules().unwrap();
        let stats = filter.sync(src.path(), dest.path()).unwrap();

        // link itself is copied verbatim; the rest of the sync completed
        assert!(dest
            .path()
            .join("usr/share/broken-link")
            .symlink_metadata()
            .is_ok());
        assert!(dest.path().join("usr/include/stdio.h").exists());
        assert!(stats.copied > 0);
    }

    #[test]
    fn test_allow_all_mirrors_everything_and_deletes_extraneous() {
        let src = sample_source();
        let dest = tempfile::tempdir().unwrap();
        write(dest.path(), "leftover.txt", "gone soon");

        let filter = SyncFilter::allow_all().unwrap();
        filter.sync(src.path(), dest.path()).unwrap();

        assert_eq!(tree(src.path()), tree(dest.path()));
        assert!(!dest.path().join("leftover.txt").exists());
    }

    #[test]
    fn test_executable_bit_preserved() {
        let src = sample_source();
        let tool = src.path().join("usr/share/hooks/run.sh");
        fs::create_dir_all(tool.parent().unwrap()).unwrap();
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let dest = tempfile::tempdir().unwrap();
        SyncFilter::target_rules()
            .unwrap()
            .sync(src.path(), dest.path())
            .unwrap();

        let copied = dest.path().join("usr/share/hooks/run.sh");
        assert_ne!(copied.metadata().unwrap().permissions().mode() & 0o111, 0);
    }
}
