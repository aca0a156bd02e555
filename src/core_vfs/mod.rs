pub mod error;
pub mod listing;
pub mod path;

use crate::core_vfs::error::FsError;
use crate::core_vfs::path::resolve_virtual;
use log::warn;
use std::path::{Path, PathBuf};

/// A directory that passed every check: inside the root, existing, a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    pub virtual_path: String,
    pub real_path: PathBuf,
}

/// Maps client-visible paths onto the configured root directory.
#[derive(Debug, Clone)]
pub struct VirtualFs {
    root: PathBuf,
}

impl VirtualFs {
    pub fn new(root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn real_path(&self, virtual_path: &str) -> PathBuf {
        self.root.join(virtual_path.trim_start_matches('/'))
    }

    /// Resolves `arg` relative to `cwd` and checks it names a directory
    /// under the root. Symlinks are followed, but their target must stay
    /// under the root as well.
    pub fn resolve_dir(&self, cwd: &str, arg: &str) -> Result<ResolvedDir, FsError> {
        let virtual_path =
            resolve_virtual(cwd, arg).ok_or_else(|| FsError::OutsideRoot(arg.to_string()))?;
        let full_path = self.real_path(&virtual_path);

        let canonical = full_path
            .canonicalize()
            .map_err(|e| FsError::from_io(&virtual_path, e))?;
        if !canonical.starts_with(&self.root) {
            warn!("Path {:?} resolves outside the root: {:?}", virtual_path, canonical);
            return Err(FsError::OutsideRoot(virtual_path));
        }
        if !canonical.is_dir() {
            return Err(FsError::NotADirectory(virtual_path));
        }

        Ok(ResolvedDir {
            virtual_path,
            real_path: canonical,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, VirtualFs) {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pub/docs")).unwrap();
        fs::write(temp.path().join("readme.txt"), b"hi").unwrap();
        let vfs = VirtualFs::new(temp.path()).unwrap();
        (temp, vfs)
    }

    #[test]
    fn test_resolves_existing_directories() {
        let (_temp, vfs) = setup();
        let root = vfs.resolve_dir("/pub", "/").unwrap();
        assert_eq!(root.virtual_path, "/");
        assert_eq!(root.real_path, vfs.root());

        let docs = vfs.resolve_dir("/pub", "docs").unwrap();
        assert_eq!(docs.virtual_path, "/pub/docs");
        assert_eq!(docs.real_path, vfs.root().join("pub/docs"));
    }

    #[test]
    fn test_missing_and_non_directories() {
        let (_temp, vfs) = setup();
        assert!(matches!(vfs.resolve_dir("/", "nope"), Err(FsError::NotFound(_))));
        assert!(matches!(
            vfs.resolve_dir("/", "readme.txt"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let (_temp, vfs) = setup();
        assert!(matches!(vfs.resolve_dir("/", ".."), Err(FsError::OutsideRoot(_))));
        assert!(matches!(
            vfs.resolve_dir("/pub", "../../.."),
            Err(FsError::OutsideRoot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let (temp, vfs) = setup();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("escape")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("pub"), temp.path().join("inside")).unwrap();

        assert!(matches!(
            vfs.resolve_dir("/", "escape"),
            Err(FsError::OutsideRoot(_))
        ));
        let inside = vfs.resolve_dir("/", "inside").unwrap();
        assert_eq!(inside.virtual_path, "/inside");
    }
}
