use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Outcome of copying a static tree.
#[derive(Debug, Default)]
pub struct StaticCopy {
    /// Destination paths written, in traversal order.
    pub copied: Vec<PathBuf>,
    /// The first file that could not be copied. Copying stops there; files
    /// already copied stay in place.
    pub failed: Option<(PathBuf, io::Error)>,
}

/// Copy every regular file under `src` into `dst`, keeping relative paths.
///
/// Entries are visited in name order so repeated runs write the same files in
/// the same sequence. Symlinks and other special files are skipped.
pub fn copy_static_files(src: &Path, dst: &Path) -> StaticCopy {
    let mut outcome = StaticCopy::default();
    if let Err(err) = copy_dir(src, src, dst, &mut outcome.copied) {
        outcome.failed = Some(err);
    }
    outcome
}

fn copy_dir(
    root: &Path,
    dir: &Path,
    dst: &Path,
    copied: &mut Vec<PathBuf>,
) -> Result<(), (PathBuf, io::Error)> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(|err| (dir.to_path_buf(), err))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|err| (path.clone(), err))?;
        if file_type.is_dir() {
            copy_dir(root, &path, dst, copied)?;
            continue;
        }
        if !file_type.is_file() {
            debug!(event = "static_skipped", path = %path.display(), "skipping special file");
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        let target = dst.join(relative);
        copy_file(&path, &target).map_err(|err| (path.clone(), err))?;
        copied.push(target);
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
}
