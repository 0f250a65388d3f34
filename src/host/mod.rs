// Host resource interface
//
// Defines the operations the WASI layer consumes from its embedding: open,
// read, write, seek, stat and directory primitives over integer-identified
// resources. `OsHost` is the std::fs backed implementation.

pub mod error;
pub mod os;

use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{HostError, HostErrorKind, HostResult};
pub use os::OsHost;

/// Host resource identifier.
pub type Rid = u32;

pub const STDIN_RID: Rid = 0;
pub const STDOUT_RID: Rid = 1;
pub const STDERR_RID: Rid = 2;

/// Open flags for files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    /// Read access
    pub read: bool,
    /// Write access
    pub write: bool,
    /// Append mode
    pub append: bool,
    /// Truncate on open
    pub truncate: bool,
    /// Create if not exists
    pub create: bool,
    /// Create, failing if the file already exists
    pub create_new: bool,
}

impl OpenFlags {
    /// Create read-only flags
    pub fn read_only() -> Self {
        Self { read: true, ..Default::default() }
    }

    /// Create write-only flags
    pub fn write_only() -> Self {
        Self { write: true, ..Default::default() }
    }

    /// Create read-write flags
    pub fn read_write() -> Self {
        Self { read: true, write: true, ..Default::default() }
    }

    /// Create flags for creating a new file
    pub fn create() -> Self {
        Self { write: true, create: true, ..Default::default() }
    }

    /// Create flags with truncate
    pub fn with_truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Create flags with append
    pub fn with_append(mut self) -> Self {
        self.append = true;
        self
    }
}

/// File metadata as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub dev: u64,
    pub ino: u64,
    pub is_file: bool,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub nlink: u64,
    pub size: u64,
    pub atime: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
    pub birthtime: Option<DateTime<Utc>>,
}

/// Directory entry structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_file: bool,
    pub is_directory: bool,
    pub is_symlink: bool,
}

/// Host operations consumed by the WASI context.
///
/// Every call is synchronous. Failures must be classified into
/// [`HostErrorKind`] so the syscall adapter can translate them into errno
/// values.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait HostFs: Send {
    // Resource operations
    fn open(&mut self, path: &Path, flags: OpenFlags) -> HostResult<Rid>;
    fn close(&mut self, rid: Rid) -> HostResult<()>;
    fn read(&mut self, rid: Rid, buf: &mut [u8]) -> HostResult<usize>;
    fn write(&mut self, rid: Rid, buf: &[u8]) -> HostResult<usize>;
    fn seek(&mut self, rid: Rid, pos: SeekFrom) -> HostResult<u64>;
    fn fdatasync(&mut self, rid: Rid) -> HostResult<()>;
    fn fsync(&mut self, rid: Rid) -> HostResult<()>;
    fn ftruncate(&mut self, rid: Rid, size: u64) -> HostResult<()>;
    fn fstat(&mut self, rid: Rid) -> HostResult<FileInfo>;

    // Path operations
    fn stat(&mut self, path: &Path) -> HostResult<FileInfo>;
    fn lstat(&mut self, path: &Path) -> HostResult<FileInfo>;
    fn utime(
        &mut self,
        path: &Path,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> HostResult<()>;
    fn mkdir(&mut self, path: &Path) -> HostResult<()>;
    fn remove(&mut self, path: &Path) -> HostResult<()>;
    fn rename(&mut self, from: &Path, to: &Path) -> HostResult<()>;
    fn link(&mut self, from: &Path, to: &Path) -> HostResult<()>;
    fn symlink(&mut self, target: &Path, path: &Path) -> HostResult<()>;
    fn read_link(&mut self, path: &Path) -> HostResult<PathBuf>;
    fn read_dir(&mut self, path: &Path) -> HostResult<Vec<DirEntry>>;
    fn real_path(&mut self, path: &Path) -> HostResult<PathBuf>;

    // Entropy and clocks
    fn fill_random(&mut self, buf: &mut [u8]) -> HostResult<()>;
    fn wall_clock(&self) -> DateTime<Utc>;
    fn monotonic_clock(&self) -> Duration;
}
