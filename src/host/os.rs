// OsHost - host resource operations backed by std::fs

use super::{DirEntry, FileInfo, HostError, HostErrorKind, HostFs, HostResult, OpenFlags, Rid};
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::fs::{self, File, FileTimes};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

enum Resource {
    Stdin,
    Stdout,
    Stderr,
    File(File),
}

/// Host backed by the local filesystem and the process's standard streams.
///
/// Resources 0, 1 and 2 are the standard streams; files opened through
/// [`HostFs::open`] receive increasing identifiers starting at 3.
pub struct OsHost {
    resources: HashMap<Rid, Resource>,
    next_rid: Rid,
    origin: Instant,
}

impl Default for OsHost {
    fn default() -> Self {
        Self::new()
    }
}

impl OsHost {
    pub fn new() -> Self {
        let mut resources = HashMap::new();
        resources.insert(super::STDIN_RID, Resource::Stdin);
        resources.insert(super::STDOUT_RID, Resource::Stdout);
        resources.insert(super::STDERR_RID, Resource::Stderr);
        Self { resources, next_rid: 3, origin: Instant::now() }
    }

    /// Number of open resources, standard streams included.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn resource(&mut self, rid: Rid) -> HostResult<&mut Resource> {
        self.resources.get_mut(&rid).ok_or_else(|| HostError::bad_resource(rid))
    }

    fn file(&mut self, rid: Rid) -> HostResult<&mut File> {
        match self.resource(rid)? {
            Resource::File(file) => Ok(file),
            _ => Err(HostError::new(
                HostErrorKind::BadResource,
                format!("resource {} is not a file", rid),
            )),
        }
    }
}

fn to_datetime(time: io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

#[cfg(unix)]
fn file_ids(meta: &fs::Metadata) -> (u64, u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (meta.dev(), meta.ino(), meta.nlink())
}

#[cfg(not(unix))]
fn file_ids(_meta: &fs::Metadata) -> (u64, u64, u64) {
    (0, 0, 1)
}

fn file_info(meta: &fs::Metadata) -> FileInfo {
    let (dev, ino, nlink) = file_ids(meta);
    let file_type = meta.file_type();
    FileInfo {
        dev,
        ino,
        is_file: file_type.is_file(),
        is_directory: file_type.is_dir(),
        is_symlink: file_type.is_symlink(),
        nlink,
        size: meta.len(),
        atime: to_datetime(meta.accessed()),
        mtime: to_datetime(meta.modified()),
        birthtime: to_datetime(meta.created()),
    }
}

#[cfg(unix)]
fn stream_info(resource: &Resource) -> HostResult<FileInfo> {
    use std::os::fd::AsFd;

    let owned = match resource {
        Resource::Stdin => io::stdin().as_fd().try_clone_to_owned()?,
        Resource::Stdout => io::stdout().as_fd().try_clone_to_owned()?,
        Resource::Stderr => io::stderr().as_fd().try_clone_to_owned()?,
        Resource::File(file) => return Ok(file_info(&file.metadata()?)),
    };
    Ok(file_info(&File::from(owned).metadata()?))
}

#[cfg(not(unix))]
fn stream_info(resource: &Resource) -> HostResult<FileInfo> {
    match resource {
        Resource::File(file) => Ok(file_info(&file.metadata()?)),
        _ => Err(HostError::new(HostErrorKind::Other, "cannot stat a standard stream")),
    }
}

impl HostFs for OsHost {
    fn open(&mut self, path: &Path, flags: OpenFlags) -> HostResult<Rid> {
        let file = fs::OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .append(flags.append)
            .truncate(flags.truncate)
            .create(flags.create)
            .create_new(flags.create_new)
            .open(path)?;

        let rid = self.next_rid;
        self.next_rid += 1;
        self.resources.insert(rid, Resource::File(file));
        tracing::debug!(rid, path = %path.display(), "opened host resource");
        Ok(rid)
    }

    fn close(&mut self, rid: Rid) -> HostResult<()> {
        self.resources.remove(&rid).ok_or_else(|| HostError::bad_resource(rid))?;
        tracing::debug!(rid, "closed host resource");
        Ok(())
    }

    fn read(&mut self, rid: Rid, buf: &mut [u8]) -> HostResult<usize> {
        let read = match self.resource(rid)? {
            Resource::Stdin => io::stdin().read(buf)?,
            Resource::File(file) => file.read(buf)?,
            Resource::Stdout | Resource::Stderr => {
                return Err(HostError::new(
                    HostErrorKind::BadResource,
                    format!("resource {} is not readable", rid),
                ));
            }
        };
        Ok(read)
    }

    fn write(&mut self, rid: Rid, buf: &[u8]) -> HostResult<usize> {
        let written = match self.resource(rid)? {
            Resource::Stdout => {
                let mut stdout = io::stdout();
                let written = stdout.write(buf)?;
                stdout.flush()?;
                written
            }
            Resource::Stderr => io::stderr().write(buf)?,
            Resource::File(file) => file.write(buf)?,
            Resource::Stdin => {
                return Err(HostError::new(
                    HostErrorKind::BadResource,
                    format!("resource {} is not writable", rid),
                ));
            }
        };
        Ok(written)
    }

    fn seek(&mut self, rid: Rid, pos: SeekFrom) -> HostResult<u64> {
        Ok(self.file(rid)?.seek(pos)?)
    }

    fn fdatasync(&mut self, rid: Rid) -> HostResult<()> {
        Ok(self.file(rid)?.sync_data()?)
    }

    fn fsync(&mut self, rid: Rid) -> HostResult<()> {
        Ok(self.file(rid)?.sync_all()?)
    }

    fn ftruncate(&mut self, rid: Rid, size: u64) -> HostResult<()> {
        Ok(self.file(rid)?.set_len(size)?)
    }

    fn fstat(&mut self, rid: Rid) -> HostResult<FileInfo> {
        stream_info(self.resource(rid)?)
    }

    fn stat(&mut self, path: &Path) -> HostResult<FileInfo> {
        Ok(file_info(&fs::metadata(path)?))
    }

    fn lstat(&mut self, path: &Path) -> HostResult<FileInfo> {
        Ok(file_info(&fs::symlink_metadata(path)?))
    }

    fn utime(
        &mut self,
        path: &Path,
        atime: Option<DateTime<Utc>>,
        mtime: Option<DateTime<Utc>>,
    ) -> HostResult<()> {
        if atime.is_none() && mtime.is_none() {
            return Ok(());
        }

        let mut times = FileTimes::new();
        if let Some(atime) = atime {
            times = times.set_accessed(SystemTime::from(atime));
        }
        if let Some(mtime) = mtime {
            times = times.set_modified(SystemTime::from(mtime));
        }
        File::open(path)?.set_times(times)?;
        Ok(())
    }

    fn mkdir(&mut self, path: &Path) -> HostResult<()> {
        Ok(fs::create_dir(path)?)
    }

    fn remove(&mut self, path: &Path) -> HostResult<()> {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> HostResult<()> {
        Ok(fs::rename(from, to)?)
    }

    fn link(&mut self, from: &Path, to: &Path) -> HostResult<()> {
        Ok(fs::hard_link(from, to)?)
    }

    #[cfg(unix)]
    fn symlink(&mut self, target: &Path, path: &Path) -> HostResult<()> {
        Ok(std::os::unix::fs::symlink(target, path)?)
    }

    #[cfg(not(unix))]
    fn symlink(&mut self, target: &Path, path: &Path) -> HostResult<()> {
        Err(HostError::new(
            HostErrorKind::Other,
            format!("symlinks are not supported: {} -> {}", path.display(), target.display()),
        ))
    }

    fn read_link(&mut self, path: &Path) -> HostResult<PathBuf> {
        Ok(fs::read_link(path)?)
    }

    fn read_dir(&mut self, path: &Path) -> HostResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_file: file_type.is_file(),
                is_directory: file_type.is_dir(),
                is_symlink: file_type.is_symlink(),
            });
        }
        Ok(entries)
    }

    fn real_path(&mut self, path: &Path) -> HostResult<PathBuf> {
        Ok(fs::canonicalize(path)?)
    }

    fn fill_random(&mut self, buf: &mut [u8]) -> HostResult<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| HostError::new(HostErrorKind::Other, e.to_string()))
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_clock(&self) -> Duration {
        self.origin.elapsed()
    }
}
