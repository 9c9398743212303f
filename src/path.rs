//! Conversions between local paths and the `/`-separated names used on the wire.

use crate::{Result, WatchSyncError};
use std::path::{Component, Path, PathBuf};

/// Suffix appended to every remote object, since payloads are gzip streams.
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Render a path with `/` separators regardless of the host convention.
pub fn to_wire(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Relative path of `path` under `root`, in wire form.
///
/// This is a component-wise prefix strip: `/srv/watch` is not a prefix of
/// `/srv/watcher/a.txt`, and the root itself has no relative path.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let outside = || WatchSyncError::PathOutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let rel = path.strip_prefix(root).map_err(|_| outside())?;
    if rel.as_os_str().is_empty() {
        return Err(outside());
    }
    Ok(to_wire(rel))
}

/// Name of the remote object that mirrors the file at `relative`.
pub fn remote_object_name(relative: &str) -> String {
    format!("{}{}", relative, COMPRESSED_SUFFIX)
}

/// Map a remote name onto a local path under `root`.
///
/// Rejects anything that could land outside `root`: absolute names, `.`/`..`
/// segments, empty segments and segments the host would parse as more than
/// one path component (drive prefixes, backslashes on Windows).
pub fn from_wire(root: &Path, name: &str) -> Result<PathBuf> {
    let invalid = || WatchSyncError::InvalidRemoteName(name.to_string());

    if name.is_empty() || name.contains('\0') {
        return Err(invalid());
    }

    let mut local = root.to_path_buf();
    for segment in name.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == segment => local.push(part),
            _ => return Err(invalid()),
        }
    }
    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslashes_become_slashes() {
        assert_eq!(to_wire(Path::new("sub\\dir\\b.txt")), "sub/dir/b.txt");
        assert_eq!(to_wire(Path::new("sub/dir/b.txt")), "sub/dir/b.txt");
    }

    #[test]
    fn test_relative_path_is_prefix_strip() {
        let root = Path::new("/srv/watch");
        assert_eq!(relative_path(root, Path::new("/srv/watch/a.txt")).unwrap(), "a.txt");
        // A character-set trim of "/srv/watch" would also eat the leading "watch".
        assert_eq!(
            relative_path(root, Path::new("/srv/watch/watch/a.txt")).unwrap(),
            "watch/a.txt"
        );
        assert_eq!(
            relative_path(root, Path::new("/srv/watch/sub/dir/c.txt")).unwrap(),
            "sub/dir/c.txt"
        );
    }

    #[test]
    fn test_relative_path_rejects_siblings_and_root() {
        let root = Path::new("/srv/watch");
        assert!(matches!(
            relative_path(root, Path::new("/srv/watcher/a.txt")),
            Err(WatchSyncError::PathOutsideRoot { .. })
        ));
        assert!(relative_path(root, Path::new("/srv/watch")).is_err());
        assert!(relative_path(root, Path::new("/other/a.txt")).is_err());
    }

    #[test]
    fn test_remote_object_name() {
        assert_eq!(remote_object_name("sub/a.txt"), "sub/a.txt.gz");
    }

    #[test]
    fn test_from_wire() {
        let root = Path::new("/recv");
        assert_eq!(from_wire(root, "a.txt").unwrap(), Path::new("/recv/a.txt"));
        assert_eq!(from_wire(root, "x/y/z.bin").unwrap(), Path::new("/recv/x/y/z.bin"));

        for bad in ["", "../etc/passwd", "a/../../b", "/abs", "a//b", "./a", "a/", "nul\0"] {
            assert!(from_wire(root, bad).is_err(), "accepted {:?}", bad);
        }
    }
}
