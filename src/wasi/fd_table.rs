// WASI file descriptor table management

use crate::host::{DirEntry, FileInfo, HostFs, Rid};
use crate::wasi::error::WasiResult;
use crate::wasi::types::{Errno, FdFlags, FileType};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File descriptor entry
///
/// An entry either owns a host resource, or is a directory placeholder that
/// only serves as the root for path operations.
#[derive(Debug, Clone, Default)]
pub struct FileDescriptor {
    /// Host resource backing byte-level operations
    handle: Option<Rid>,
    /// Cached type; `Unknown` until first inferred from metadata
    file_type: FileType,
    /// Status flags given at open time
    flags: FdFlags,
    /// Real host path this descriptor is rooted at
    path: Option<PathBuf>,
    /// Guest-visible name of a preopened directory
    virtual_path: Option<String>,
    /// Directory listing captured when the entry was created
    entries: Option<Vec<DirEntry>>,
}

impl FileDescriptor {
    /// Standard stream entry
    pub fn stdio(rid: Rid) -> Self {
        Self {
            handle: Some(rid),
            file_type: FileType::CharacterDevice,
            flags: FdFlags::APPEND,
            ..Default::default()
        }
    }

    /// Preopened directory exposed under `virtual_path`
    pub fn preopen(virtual_path: String, path: PathBuf, entries: Vec<DirEntry>) -> Self {
        Self {
            virtual_path: Some(virtual_path),
            ..Self::directory(path, entries)
        }
    }

    /// Directory placeholder created by `path_open(O_DIRECTORY)`
    pub fn directory(path: PathBuf, entries: Vec<DirEntry>) -> Self {
        Self {
            file_type: FileType::Directory,
            path: Some(path),
            entries: Some(entries),
            ..Default::default()
        }
    }

    /// Opened file
    pub fn file(rid: Rid, path: PathBuf, flags: FdFlags) -> Self {
        Self { handle: Some(rid), flags, path: Some(path), ..Default::default() }
    }

    /// Host resource, or `EBADF` for a directory placeholder
    pub fn handle(&self) -> WasiResult<Rid> {
        self.handle.ok_or_else(|| Errno::BadF.into())
    }

    pub fn raw_handle(&self) -> Option<Rid> {
        self.handle
    }

    /// Rooted host path, or `EINVAL` for entries without one
    pub fn path(&self) -> WasiResult<&Path> {
        self.path.as_deref().ok_or_else(|| Errno::Inval.into())
    }

    pub fn virtual_path(&self) -> Option<&str> {
        self.virtual_path.as_deref()
    }

    pub fn flags(&self) -> FdFlags {
        self.flags
    }

    pub fn entries(&self) -> Option<&[DirEntry]> {
        self.entries.as_deref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.handle.is_none()
    }

    /// Memoized file type, fetching metadata from the host on first use.
    pub fn file_type(&mut self, host: &mut dyn HostFs) -> WasiResult<FileType> {
        if self.file_type != FileType::Unknown {
            return Ok(self.file_type);
        }

        let info = match self.handle {
            Some(rid) => host.fstat(rid)?,
            None => host.stat(self.path()?)?,
        };
        Ok(self.file_type_from(&info))
    }

    /// Memoized file type, inferring it from already fetched metadata.
    pub fn file_type_from(&mut self, info: &FileInfo) -> FileType {
        if self.file_type == FileType::Unknown {
            self.file_type = FileType::classify(info.is_file, info.is_directory, info.is_symlink);
        }
        self.file_type
    }
}

/// File descriptor table
#[derive(Debug)]
pub struct FdTable {
    /// Map from fd to descriptor
    fds: BTreeMap<u32, FileDescriptor>,
    /// Next fd handed out by `allocate`; never reused
    next_fd: u32,
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self { fds: BTreeMap::new(), next_fd: 0 }
    }

    /// Append a descriptor and return its number
    pub fn allocate(&mut self, descriptor: FileDescriptor) -> u32 {
        let fd = self.next_fd;
        self.fds.insert(fd, descriptor);
        self.next_fd += 1;
        fd
    }

    /// Get a file descriptor
    pub fn get(&self, fd: u32) -> WasiResult<&FileDescriptor> {
        self.fds.get(&fd).ok_or_else(|| Errno::BadF.into())
    }

    /// Get a mutable file descriptor
    pub fn get_mut(&mut self, fd: u32) -> WasiResult<&mut FileDescriptor> {
        self.fds.get_mut(&fd).ok_or_else(|| Errno::BadF.into())
    }

    /// Clear a slot and hand back its entry
    pub fn remove(&mut self, fd: u32) -> WasiResult<FileDescriptor> {
        self.fds.remove(&fd).ok_or_else(|| Errno::BadF.into())
    }

    /// Move `from` into slot `to`.
    ///
    /// Returns the entry previously held by `to`; the caller owns closing
    /// its resource.
    pub fn renumber(&mut self, from: u32, to: u32) -> WasiResult<Option<FileDescriptor>> {
        self.get(from)?;
        if from == to {
            return Ok(None);
        }

        let descriptor = self.remove(from)?;
        let displaced = self.fds.insert(to, descriptor);
        if to >= self.next_fd {
            self.next_fd = to.saturating_add(1);
        }
        Ok(displaced)
    }

    pub fn contains(&self, fd: u32) -> bool {
        self.fds.contains_key(&fd)
    }

    /// Get the number of open file descriptors
    pub fn len(&self) -> usize {
        self.fds.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &FileDescriptor)> {
        self.fds.iter().map(|(fd, descriptor)| (*fd, descriptor))
    }
}
