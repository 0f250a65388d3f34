// Capability-scoped path resolution

use crate::wasi::error::WasiResult;
use crate::wasi::types::Errno;
use std::path::{Component, Path, PathBuf};

/// Resolve a guest path against a descriptor's root.
///
/// Resolution is purely lexical: an absolute guest path replaces the root,
/// `.` is dropped and `..` pops one component. The filesystem is never
/// consulted, so symlinks are left for the caller to check.
pub fn resolve(root: &Path, guest_path: &str) -> WasiResult<PathBuf> {
    if guest_path.contains('\0') {
        return Err(Errno::Inval.into());
    }

    let mut resolved = PathBuf::new();
    for component in root.join(guest_path).components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
        }
    }

    if resolved.as_os_str().is_empty() {
        resolved.push(".");
    }
    Ok(resolved)
}

/// Whether `path` stays inside `root`.
///
/// Both sides must already be normalized. A path escapes when its
/// relation to `root` would start with `..`.
pub fn is_contained(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root).is_ok()
}

/// `resolve` followed by the sandbox check; escapes are `ENOTCAPABLE`.
pub fn resolve_contained(root: &Path, guest_path: &str) -> WasiResult<PathBuf> {
    let resolved = resolve(root, guest_path)?;
    ensure_contained(root, &resolved)?;
    Ok(resolved)
}

pub fn ensure_contained(root: &Path, path: &Path) -> WasiResult<()> {
    if is_contained(root, path) {
        Ok(())
    } else {
        tracing::warn!(root = %root.display(), path = %path.display(), "path escapes sandbox");
        Err(Errno::NotCapable.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wasi::error::WasiError;

    #[test]
    fn test_resolve_relative() {
        let root = Path::new("/real/sandbox");
        assert_eq!(resolve(root, "hello.txt").unwrap(), PathBuf::from("/real/sandbox/hello.txt"));
        assert_eq!(resolve(root, "a/b/c").unwrap(), PathBuf::from("/real/sandbox/a/b/c"));
    }

    #[test]
    fn test_resolve_folds_dots() {
        let root = Path::new("/real/sandbox");
        assert_eq!(resolve(root, "./a/../b").unwrap(), PathBuf::from("/real/sandbox/b"));
        assert_eq!(resolve(root, "a//b/").unwrap(), PathBuf::from("/real/sandbox/a/b"));
        assert_eq!(resolve(root, ".").unwrap(), PathBuf::from("/real/sandbox"));
    }

    #[test]
    fn test_resolve_parent_escape() {
        let root = Path::new("/real/sandbox");
        assert_eq!(resolve(root, "../../etc/passwd").unwrap(), PathBuf::from("/etc/passwd"));
        assert_eq!(resolve(root, "../../../../..").unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn test_resolve_absolute_replaces_root() {
        let root = Path::new("/real/sandbox");
        assert_eq!(resolve(root, "/etc/passwd").unwrap(), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_resolve_rejects_nul() {
        let root = Path::new("/real/sandbox");
        assert!(matches!(resolve(root, "a\0b"), Err(WasiError::Errno(Errno::Inval))));
    }

    #[test]
    fn test_is_contained() {
        let root = Path::new("/real/sandbox");
        assert!(is_contained(root, Path::new("/real/sandbox")));
        assert!(is_contained(root, Path::new("/real/sandbox/a/b")));
        assert!(!is_contained(root, Path::new("/real")));
        assert!(!is_contained(root, Path::new("/real/sandbox2/file")));
        assert!(!is_contained(root, Path::new("/etc/passwd")));
    }

    #[test]
    fn test_resolve_contained() {
        let root = Path::new("/real/sandbox");
        assert!(resolve_contained(root, "dir/../file").is_ok());
        assert!(matches!(
            resolve_contained(root, "../../etc/passwd"),
            Err(WasiError::Errno(Errno::NotCapable))
        ));
        assert!(matches!(
            resolve_contained(root, "/etc/passwd"),
            Err(WasiError::Errno(Errno::NotCapable))
        ));
        assert!(matches!(
            resolve_contained(root, "a/../../sandbox2"),
            Err(WasiError::Errno(Errno::NotCapable))
        ));
    }
}
