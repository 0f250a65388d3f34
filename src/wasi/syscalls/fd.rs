// fd_* syscalls

use super::{set_times, write_filestat};
use crate::host::{HostFs, Rid};
use crate::wasi::context::Context;
use crate::wasi::error::{WasiError, WasiResult};
use crate::wasi::fd_table::FileDescriptor;
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::{
    DIRENT_HEADER_SIZE, Errno, FDSTAT_SIZE, FileType, FstFlags, PREOPENTYPE_DIR, PRESTAT_SIZE,
    Whence,
};
use std::io::SeekFrom;
use tracing::debug;

/// Scatter a read from `rid` across the guest's iovecs.
fn read_vectored(
    host: &mut dyn HostFs,
    mem: &mut GuestMemory<'_>,
    rid: Rid,
    iovs: u32,
    iovs_len: u32,
) -> WasiResult<u32> {
    let mut total: u32 = 0;
    for iov in mem.iovecs(iovs, iovs_len)? {
        let buf = mem.slice_mut(iov.buf, iov.len)?;
        let n = host.read(rid, buf)?;
        total = total.saturating_add(n as u32);
        if n < iov.len as usize {
            break;
        }
    }
    Ok(total)
}

/// Gather a write to `rid` from the guest's iovecs.
fn write_vectored(
    host: &mut dyn HostFs,
    mem: &mut GuestMemory<'_>,
    rid: Rid,
    iovs: u32,
    iovs_len: u32,
) -> WasiResult<u32> {
    let mut total: u32 = 0;
    for iov in mem.iovecs(iovs, iovs_len)? {
        let buf = mem.slice(iov.buf, iov.len)?;
        let n = host.write(rid, buf)?;
        total = total.saturating_add(n as u32);
        if n < iov.len as usize {
            break;
        }
    }
    Ok(total)
}

/// Run `transfer` at absolute `offset`, restoring the position afterwards.
fn at_offset<F>(host: &mut dyn HostFs, rid: Rid, offset: u64, transfer: F) -> WasiResult<u32>
where
    F: FnOnce(&mut dyn HostFs) -> WasiResult<u32>,
{
    let saved = host.seek(rid, SeekFrom::Current(0))?;
    let result = host
        .seek(rid, SeekFrom::Start(offset))
        .map_err(WasiError::from)
        .and_then(|_| transfer(&mut *host));
    host.seek(rid, SeekFrom::Start(saved))?;
    result
}

impl Context {
    pub fn fd_advise(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _offset: u64,
        _len: u64,
        _advice: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn fd_allocate(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _offset: u64,
        _len: u64,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn fd_close(&mut self, _mem: &mut GuestMemory<'_>, fd: u32) -> WasiResult<()> {
        let entry = self.fds.remove(fd)?;
        if let Some(rid) = entry.raw_handle() {
            self.host.close(rid)?;
        }
        debug!(fd, "closed descriptor");
        Ok(())
    }

    pub fn fd_datasync(&mut self, _mem: &mut GuestMemory<'_>, fd: u32) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        self.host.fdatasync(rid)?;
        Ok(())
    }

    pub fn fd_sync(&mut self, _mem: &mut GuestMemory<'_>, fd: u32) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        self.host.fsync(rid)?;
        Ok(())
    }

    pub fn fd_fdstat_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        stat_ptr: u32,
    ) -> WasiResult<()> {
        let entry = self.fds.get_mut(fd)?;
        let file_type = entry.file_type(self.host.as_mut())?;

        // Rights are not tracked; both rights words stay zero
        mem.write_bytes(stat_ptr, &[0u8; FDSTAT_SIZE as usize])?;
        mem.write_u8(stat_ptr, file_type.raw())?;
        mem.write_u16(stat_ptr + 2, entry.flags().bits())
    }

    pub fn fd_fdstat_set_flags(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _flags: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn fd_fdstat_set_rights(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _base: u64,
        _inheriting: u64,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn fd_filestat_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        buf_ptr: u32,
    ) -> WasiResult<()> {
        let entry = self.fds.get_mut(fd)?;
        let info = match entry.raw_handle() {
            Some(rid) => self.host.fstat(rid)?,
            None => self.host.stat(entry.path()?)?,
        };
        let file_type = entry.file_type_from(&info);
        write_filestat(mem, buf_ptr, &info, file_type)
    }

    pub fn fd_filestat_set_size(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        fd: u32,
        size: u64,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        self.host.ftruncate(rid, size)?;
        Ok(())
    }

    pub fn fd_filestat_set_times(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        fd: u32,
        atim: u64,
        mtim: u64,
        fst_flags: u32,
    ) -> WasiResult<()> {
        let flags = FstFlags::from_bits_truncate(fst_flags as u16);
        let path = self.fds.get(fd)?.path()?.to_path_buf();
        set_times(self.host.as_mut(), &path, atim, mtim, flags)
    }

    pub fn fd_pread(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        offset: u64,
        nread_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let nread = at_offset(self.host.as_mut(), rid, offset, |host| {
            read_vectored(host, mem, rid, iovs, iovs_len)
        })?;
        mem.write_u32(nread_ptr, nread)
    }

    pub fn fd_pwrite(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        offset: u64,
        nwritten_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let nwritten = at_offset(self.host.as_mut(), rid, offset, |host| {
            write_vectored(host, mem, rid, iovs, iovs_len)
        })?;
        mem.write_u32(nwritten_ptr, nwritten)
    }

    pub fn fd_read(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        nread_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let nread = read_vectored(self.host.as_mut(), mem, rid, iovs, iovs_len)?;
        mem.write_u32(nread_ptr, nread)
    }

    pub fn fd_write(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        iovs: u32,
        iovs_len: u32,
        nwritten_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let nwritten = write_vectored(self.host.as_mut(), mem, rid, iovs, iovs_len)?;
        mem.write_u32(nwritten_ptr, nwritten)
    }

    pub fn fd_prestat_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        prestat_ptr: u32,
    ) -> WasiResult<()> {
        let virtual_path = self.fds.get(fd)?.virtual_path().ok_or(Errno::BadF)?;
        let len = virtual_path.len() as u32;

        mem.write_bytes(prestat_ptr, &[0u8; PRESTAT_SIZE as usize])?;
        mem.write_u8(prestat_ptr, PREOPENTYPE_DIR)?;
        mem.write_u32(prestat_ptr + 4, len)
    }

    pub fn fd_prestat_dir_name(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
    ) -> WasiResult<()> {
        let virtual_path = self.fds.get(fd)?.virtual_path().ok_or(Errno::BadF)?;
        if virtual_path.len() > path_len as usize {
            return Err(Errno::NameTooLong.into());
        }
        mem.write_bytes(path_ptr, virtual_path.as_bytes())
    }

    /// List the directory from `cookie` onwards into the guest buffer.
    ///
    /// The listing is taken fresh on every call and sorted by name; a cookie
    /// is the index of the next entry.
    pub fn fd_readdir(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        buf_ptr: u32,
        buf_len: u32,
        cookie: u64,
        bufused_ptr: u32,
    ) -> WasiResult<()> {
        let dir = self.fds.get(fd)?.path()?.to_path_buf();
        let mut entries = self.host.read_dir(&dir)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let capacity = buf_len as usize;
        let mut used = 0usize;
        let start = usize::try_from(cookie).unwrap_or(usize::MAX);

        for (index, entry) in entries.iter().enumerate().skip(start) {
            let ino = self.host.lstat(&dir.join(&entry.name)).map(|info| info.ino).unwrap_or(0);
            let file_type = FileType::classify(entry.is_file, entry.is_directory, entry.is_symlink);
            let name = entry.name.as_bytes();

            let mut record = Vec::with_capacity(DIRENT_HEADER_SIZE + name.len());
            record.extend_from_slice(&(index as u64 + 1).to_le_bytes());
            record.extend_from_slice(&ino.to_le_bytes());
            record.extend_from_slice(&(name.len() as u32).to_le_bytes());
            record.push(file_type.raw());
            record.extend_from_slice(&[0u8; 3]);
            record.extend_from_slice(name);

            let take = record.len().min(capacity - used);
            let dst = buf_ptr.checked_add(used as u32).ok_or(Errno::Fault)?;
            mem.write_bytes(dst, &record[..take])?;
            used += take;
            if used == capacity {
                break;
            }
        }

        mem.write_u32(bufused_ptr, used as u32)
    }

    /// Move `fd` to `to`, closing whatever `to` held.
    ///
    /// The displaced resource is closed before the table changes, so a
    /// failed close leaves both descriptors in place.
    pub fn fd_renumber(&mut self, _mem: &mut GuestMemory<'_>, fd: u32, to: u32) -> WasiResult<()> {
        self.fds.get(fd)?;
        if fd != to {
            if let Some(rid) = self.fds.get(to).ok().and_then(FileDescriptor::raw_handle) {
                self.host.close(rid)?;
            }
        }
        self.fds.renumber(fd, to)?;
        debug!(from = fd, to, "renumbered descriptor");
        Ok(())
    }

    pub fn fd_seek(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        offset: i64,
        whence: u32,
        newoffset_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let pos = match Whence::try_from(whence)? {
            Whence::Set => SeekFrom::Start(u64::try_from(offset).map_err(|_| Errno::Inval)?),
            Whence::Cur => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let newoffset = self.host.seek(rid, pos)?;
        mem.write_u64(newoffset_ptr, newoffset)
    }

    pub fn fd_tell(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        offset_ptr: u32,
    ) -> WasiResult<()> {
        let rid = self.fds.get(fd)?.handle()?;
        let offset = self.host.seek(rid, SeekFrom::Current(0))?;
        mem.write_u64(offset_ptr, offset)
    }
}
