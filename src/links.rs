//! Loop prevention for walks that follow symbolic links.

use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Directories already claimed for descent in one walk, keyed by canonical path.
#[derive(Debug, Default)]
pub(crate) struct VisitedDirs {
    seen: Mutex<HashSet<PathBuf>>,
}

impl VisitedDirs {
    /// Returns true the first time the directory behind `path` is claimed.
    ///
    /// A path that cannot be canonicalized is not descended.
    pub(crate) fn claim(&self, path: &Path) -> bool {
        let Ok(canonical) = fs::canonicalize(path) else {
            return false;
        };
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical)
    }
}

/// Whether `metadata` (from lstat) is a link that resolves to a directory.
pub(crate) fn links_to_dir(path: &Path, metadata: &Metadata) -> bool {
    metadata.file_type().is_symlink() && fs::metadata(path).is_ok_and(|target| target.is_dir())
}
