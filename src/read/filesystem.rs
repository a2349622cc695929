//! Filesystem helpers for writing extracted entries.

use std::fs::File;
use std::path::Path;

use super::CEntryKind;
use crate::{Error, Result};

/// Creates a symbolic link at `link_path` pointing to `target`.
#[cfg(unix)]
pub(crate) fn create_symlink(link_path: &Path, target: &str) -> Result<()> {
    std::os::unix::fs::symlink(target, link_path).map_err(Error::Io)
}

/// Creates a symbolic link at `link_path` pointing to `target`.
#[cfg(windows)]
pub(crate) fn create_symlink(link_path: &Path, target: &str) -> Result<()> {
    // Directory links need their own call; anything else is a file link
    let resolved = link_path.parent().map(|p| p.join(target));
    if resolved.as_deref().is_some_and(Path::is_dir) {
        return std::os::windows::fs::symlink_dir(target, link_path).map_err(Error::Io);
    }
    std::os::windows::fs::symlink_file(target, link_path).map_err(Error::Io)
}

/// Creates a symbolic link at `link_path` pointing to `target`.
#[cfg(not(any(unix, windows)))]
pub(crate) fn create_symlink(_link_path: &Path, _target: &str) -> Result<()> {
    Err(Error::InvalidArgument(
        "symbolic links are not supported on this platform".into(),
    ))
}

/// Returns true if `root.join(relative)` or any directory between `root`
/// and it is an existing symbolic link.
///
/// Writing through such a path would land outside `root`.
pub(crate) fn crosses_symlink(root: &Path, relative: &Path) -> bool {
    let mut current = root.to_path_buf();
    relative.components().any(|component| {
        current.push(component);
        std::fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink())
    })
}

/// Restricts an extracted file to its owner.
///
/// Binaries are made executable (0o700); everything else is 0o600.
#[cfg(unix)]
pub(crate) fn apply_entry_mode(file: &File, kind: CEntryKind) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if kind == CEntryKind::Binary { 0o700 } else { 0o600 };
    file.set_permissions(std::fs::Permissions::from_mode(mode))
        .map_err(Error::Io)
}

/// Restricts an extracted file to its owner (no-op on this platform).
#[cfg(not(unix))]
pub(crate) fn apply_entry_mode(_file: &File, _kind: CEntryKind) -> Result<()> {
    Ok(())
}
