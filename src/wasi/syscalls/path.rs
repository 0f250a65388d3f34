// path_* syscalls

use super::{set_times, write_filestat};
use crate::host::OpenFlags;
use crate::wasi::context::Context;
use crate::wasi::error::WasiResult;
use crate::wasi::fd_table::FileDescriptor;
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::{Errno, FdFlags, FileType, FstFlags, LookupFlags, OFlags, Rights};
use std::path::Path;
use tracing::debug;

fn follows(lookup_flags: u32) -> bool {
    LookupFlags::from_bits_truncate(lookup_flags).contains(LookupFlags::SYMLINK_FOLLOW)
}

/// Host open options derived from the guest's open flags, rights and fd flags.
fn open_flags(oflags: OFlags, rights: Rights, fdflags: FdFlags) -> OpenFlags {
    let mut flags = OpenFlags::default();
    if oflags.contains(OFlags::CREAT) {
        flags.create = true;
        flags.write = true;
    }
    if oflags.contains(OFlags::EXCL) {
        flags.create_new = true;
        flags.write = true;
    }
    if oflags.contains(OFlags::TRUNC) {
        flags.truncate = true;
        flags.write = true;
    }
    if rights.intersects(Rights::READ_ACCESS) {
        flags.read = true;
    }
    if rights.intersects(Rights::WRITE_ACCESS) {
        flags.write = true;
    }
    if fdflags.contains(FdFlags::APPEND) {
        flags.append = true;
    }
    if !flags.read && !flags.write && !flags.truncate {
        flags.read = true;
    }
    flags
}

impl Context {
    pub fn path_create_directory(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
    ) -> WasiResult<()> {
        let path = self.resolve_at(mem, fd, path_ptr, path_len, false)?;
        self.host.mkdir(&path)?;
        Ok(())
    }

    pub fn path_filestat_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        flags: u32,
        path_ptr: u32,
        path_len: u32,
        buf_ptr: u32,
    ) -> WasiResult<()> {
        let follow = follows(flags);
        let path = self.resolve_at(mem, fd, path_ptr, path_len, follow)?;
        let info = if follow { self.host.stat(&path)? } else { self.host.lstat(&path)? };
        let file_type = FileType::classify(info.is_file, info.is_directory, info.is_symlink);
        write_filestat(mem, buf_ptr, &info, file_type)
    }

    /// Set a path's timestamps. Without `SYMLINK_FOLLOW` a symlink's own
    /// times cannot be changed through the host and the call is `ENOTSUP`.
    #[allow(clippy::too_many_arguments)]
    pub fn path_filestat_set_times(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        flags: u32,
        path_ptr: u32,
        path_len: u32,
        atim: u64,
        mtim: u64,
        fst_flags: u32,
    ) -> WasiResult<()> {
        let follow = follows(flags);
        let path = self.resolve_at(mem, fd, path_ptr, path_len, follow)?;
        if !follow && self.host.lstat(&path)?.is_symlink {
            return Err(Errno::NotSup.into());
        }
        let fst_flags = FstFlags::from_bits_truncate(fst_flags as u16);
        set_times(self.host.as_mut(), &path, atim, mtim, fst_flags)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn path_link(
        &mut self,
        mem: &mut GuestMemory<'_>,
        old_fd: u32,
        _old_flags: u32,
        old_path_ptr: u32,
        old_path_len: u32,
        new_fd: u32,
        new_path_ptr: u32,
        new_path_len: u32,
    ) -> WasiResult<()> {
        let from = self.resolve_at(mem, old_fd, old_path_ptr, old_path_len, false)?;
        let to = self.resolve_at(mem, new_fd, new_path_ptr, new_path_len, false)?;
        self.host.link(&from, &to)?;
        Ok(())
    }

    /// Open a path relative to a directory descriptor and append a new
    /// descriptor for it.
    ///
    /// A path that leaves the descriptor's root, lexically or through
    /// symlinks, fails with `ENOTCAPABLE` before any host open. Without
    /// `SYMLINK_FOLLOW` a final component that is a symlink is `ELOOP`.
    #[allow(clippy::too_many_arguments)]
    pub fn path_open(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        dirflags: u32,
        path_ptr: u32,
        path_len: u32,
        oflags: u32,
        rights_base: u64,
        _rights_inheriting: u64,
        fdflags: u32,
        opened_fd_ptr: u32,
    ) -> WasiResult<()> {
        let follow = follows(dirflags);
        let path = self.resolve_at(mem, fd, path_ptr, path_len, follow)?;
        if !follow && self.host.lstat(&path).is_ok_and(|info| info.is_symlink) {
            return Err(Errno::Loop.into());
        }

        let oflags = OFlags::from_bits_truncate(oflags as u16);
        let fdflags = FdFlags::from_bits_truncate(fdflags as u16);

        let opened = if oflags.contains(OFlags::DIRECTORY) {
            let entries = self.host.read_dir(&path)?;
            self.fds.allocate(FileDescriptor::directory(path.clone(), entries))
        } else {
            let flags = open_flags(oflags, Rights::from_bits_truncate(rights_base), fdflags);
            let rid = self.host.open(&path, flags)?;
            self.fds.allocate(FileDescriptor::file(rid, path.clone(), fdflags))
        };

        debug!(fd = opened, path = %path.display(), "opened descriptor");
        mem.write_u32(opened_fd_ptr, opened)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn path_readlink(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
        buf_ptr: u32,
        buf_len: u32,
        bufused_ptr: u32,
    ) -> WasiResult<()> {
        let path = self.resolve_at(mem, fd, path_ptr, path_len, false)?;
        let target = self.host.read_link(&path)?;
        let target = target.to_string_lossy();
        let bytes = target.as_bytes();

        let used = bytes.len().min(buf_len as usize);
        mem.write_bytes(buf_ptr, &bytes[..used])?;
        mem.write_u32(bufused_ptr, used as u32)
    }

    pub fn path_remove_directory(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
    ) -> WasiResult<()> {
        let path = self.resolve_at(mem, fd, path_ptr, path_len, false)?;
        if !self.host.lstat(&path)?.is_directory {
            return Err(Errno::NotDir.into());
        }
        self.host.remove(&path)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn path_rename(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        old_path_ptr: u32,
        old_path_len: u32,
        new_fd: u32,
        new_path_ptr: u32,
        new_path_len: u32,
    ) -> WasiResult<()> {
        let from = self.resolve_at(mem, fd, old_path_ptr, old_path_len, false)?;
        let to = self.resolve_at(mem, new_fd, new_path_ptr, new_path_len, false)?;
        self.host.rename(&from, &to)?;
        Ok(())
    }

    /// Create a symlink at a rooted path. The target is stored as given.
    pub fn path_symlink(
        &mut self,
        mem: &mut GuestMemory<'_>,
        old_path_ptr: u32,
        old_path_len: u32,
        fd: u32,
        new_path_ptr: u32,
        new_path_len: u32,
    ) -> WasiResult<()> {
        let target = mem.read_string(old_path_ptr, old_path_len)?;
        if target.contains('\0') {
            return Err(Errno::Inval.into());
        }
        let path = self.resolve_at(mem, fd, new_path_ptr, new_path_len, false)?;
        self.host.symlink(Path::new(&target), &path)?;
        Ok(())
    }

    pub fn path_unlink_file(
        &mut self,
        mem: &mut GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
    ) -> WasiResult<()> {
        let path = self.resolve_at(mem, fd, path_ptr, path_len, false)?;
        if self.host.lstat(&path)?.is_directory {
            return Err(Errno::IsDir.into());
        }
        self.host.remove(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FileInfo, HostError, HostErrorKind, MockHostFs};
    use crate::wasi::config::WasiConfig;
    use crate::wasi::error::WasiError;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    const ROOT: &str = "/real/sandbox";

    fn preopened(mut host: MockHostFs) -> Context {
        host.expect_real_path()
            .with(eq(Path::new(ROOT)))
            .returning(|path| Ok(path.to_path_buf()));
        host.expect_read_dir().with(eq(Path::new(ROOT))).returning(|_| Ok(vec![]));
        let config = WasiConfig::default().with_preopen("/sandbox", ROOT);
        Context::new(config, Box::new(host)).unwrap()
    }

    fn guest_memory(path: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; 128];
        bytes[64..64 + path.len()].copy_from_slice(path.as_bytes());
        bytes
    }

    fn errno(result: WasiResult<()>) -> Errno {
        match result {
            Err(WasiError::Errno(errno)) => errno,
            other => panic!("expected errno, got {other:?}"),
        }
    }

    #[test]
    fn test_open_flags_defaults_to_read() {
        let flags = open_flags(OFlags::empty(), Rights::empty(), FdFlags::empty());
        assert_eq!(flags, OpenFlags::read_only());
    }

    #[test]
    fn test_open_flags_create_and_rights() {
        let flags = open_flags(OFlags::CREAT, Rights::FD_WRITE, FdFlags::empty());
        assert!(flags.create && flags.write && !flags.read);

        let flags = open_flags(OFlags::EXCL | OFlags::TRUNC, Rights::FD_READ, FdFlags::APPEND);
        assert!(flags.create_new && flags.truncate && flags.write && flags.read && flags.append);

        let flags = open_flags(OFlags::empty(), Rights::FD_DATASYNC, FdFlags::empty());
        assert!(flags.write && !flags.read);
    }

    #[test]
    fn test_path_open_escape_never_opens() {
        let mut host = MockHostFs::new();
        host.expect_open().never();
        let mut ctx = preopened(host);

        let path = "../../etc/passwd";
        let mut bytes = guest_memory(path);
        let mut mem = GuestMemory::new(&mut bytes);
        let result = ctx.path_open(&mut mem, 3, 0, 64, path.len() as u32, 0, 0, 0, 0, 0);
        assert_eq!(errno(result), Errno::NotCapable);
        assert_eq!(ctx.fds().len(), 4);
    }

    #[test]
    fn test_path_open_symlink_escape() {
        let mut host = MockHostFs::new();
        host.expect_real_path()
            .with(eq(Path::new("/real/sandbox/link")))
            .returning(|_| Ok(PathBuf::from("/etc/shadow")));
        host.expect_open().never();
        let mut ctx = preopened(host);

        let path = "link";
        let mut bytes = guest_memory(path);
        let mut mem = GuestMemory::new(&mut bytes);
        let follow = LookupFlags::SYMLINK_FOLLOW.bits();
        let result = ctx.path_open(&mut mem, 3, follow, 64, 4, 0, 0, 0, 0, 0);
        assert_eq!(errno(result), Errno::NotCapable);
    }

    #[test]
    fn test_path_open_allocates_descriptor() {
        let mut host = MockHostFs::new();
        host.expect_lstat()
            .returning(|_| Err(HostError::new(HostErrorKind::NotFound, "missing")));
        host.expect_open()
            .withf(|path, flags| {
                path == Path::new("/real/sandbox/out.txt") && flags.create && flags.write
            })
            .times(1)
            .returning(|_, _| Ok(17));
        let mut ctx = preopened(host);

        let path = "out.txt";
        let mut bytes = guest_memory(path);
        let mut mem = GuestMemory::new(&mut bytes);
        let rights = Rights::FD_WRITE.bits();
        ctx.path_open(&mut mem, 3, 0, 64, 7, OFlags::CREAT.bits() as u32, rights, 0, 0, 0)
            .unwrap();

        let fd = mem.read_u32(0).unwrap();
        assert_eq!(fd, 4);
        let entry = ctx.fds().get(fd).unwrap();
        assert_eq!(entry.handle().unwrap(), 17);
        assert_eq!(entry.path().unwrap(), Path::new("/real/sandbox/out.txt"));
    }

    #[test]
    fn test_path_open_directory_is_placeholder() {
        let mut host = MockHostFs::new();
        host.expect_open().never();
        host.expect_lstat()
            .returning(|_| Ok(FileInfo { is_directory: true, ..Default::default() }));
        host.expect_read_dir()
            .with(eq(Path::new("/real/sandbox/sub")))
            .times(1)
            .returning(|_| Ok(vec![]));
        let mut ctx = preopened(host);

        let path = "sub";
        let mut bytes = guest_memory(path);
        let mut mem = GuestMemory::new(&mut bytes);
        let oflags = OFlags::DIRECTORY.bits() as u32;
        ctx.path_open(&mut mem, 3, 0, 64, 3, oflags, 0, 0, 0, 0).unwrap();

        let entry = ctx.fds().get(4).unwrap();
        assert!(entry.is_placeholder());
        assert!(entry.virtual_path().is_none());
    }

    #[test]
    fn test_path_open_on_stdio_is_inval() {
        let mut ctx = preopened(MockHostFs::new());
        let mut bytes = guest_memory("x");
        let mut mem = GuestMemory::new(&mut bytes);
        assert_eq!(errno(ctx.path_open(&mut mem, 1, 0, 64, 1, 0, 0, 0, 0, 0)), Errno::Inval);
    }

    #[test]
    fn test_path_ops_enforce_containment() {
        let mut host = MockHostFs::new();
        host.expect_mkdir().never();
        host.expect_remove().never();
        host.expect_rename().never();
        let mut ctx = preopened(host);

        let path = "../escape";
        let mut bytes = guest_memory(path);
        let mut mem = GuestMemory::new(&mut bytes);
        let len = path.len() as u32;

        assert_eq!(errno(ctx.path_create_directory(&mut mem, 3, 64, len)), Errno::NotCapable);
        assert_eq!(errno(ctx.path_unlink_file(&mut mem, 3, 64, len)), Errno::NotCapable);
        assert_eq!(errno(ctx.path_remove_directory(&mut mem, 3, 64, len)), Errno::NotCapable);
        assert_eq!(errno(ctx.path_rename(&mut mem, 3, 64, len, 3, 64, len)), Errno::NotCapable);
    }

    #[test]
    fn test_path_remove_directory_requires_directory() {
        let mut host = MockHostFs::new();
        host.expect_lstat().returning(|_| Ok(FileInfo { is_file: true, ..Default::default() }));
        host.expect_remove().never();
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("f");
        let mut mem = GuestMemory::new(&mut bytes);
        assert_eq!(errno(ctx.path_remove_directory(&mut mem, 3, 64, 1)), Errno::NotDir);
    }

    #[test]
    fn test_path_unlink_file_rejects_directory() {
        let mut host = MockHostFs::new();
        host.expect_lstat()
            .returning(|_| Ok(FileInfo { is_directory: true, ..Default::default() }));
        host.expect_remove().never();
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("d");
        let mut mem = GuestMemory::new(&mut bytes);
        assert_eq!(errno(ctx.path_unlink_file(&mut mem, 3, 64, 1)), Errno::IsDir);
    }

    #[test]
    fn test_path_symlink_target_is_not_rooted() {
        let mut host = MockHostFs::new();
        host.expect_symlink()
            .with(eq(Path::new("../outside")), eq(Path::new("/real/sandbox/link")))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut ctx = preopened(host);

        let mut bytes = vec![0u8; 128];
        bytes[0..10].copy_from_slice(b"../outside");
        bytes[64..68].copy_from_slice(b"link");
        let mut mem = GuestMemory::new(&mut bytes);
        ctx.path_symlink(&mut mem, 0, 10, 3, 64, 4).unwrap();
    }

    #[test]
    fn test_path_readlink_truncates() {
        let mut host = MockHostFs::new();
        host.expect_read_link().returning(|_| Ok(PathBuf::from("target-name")));
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        ctx.path_readlink(&mut mem, 3, 64, 4, 0, 6, 8).unwrap();
        assert_eq!(mem.slice(0, 6).unwrap(), b"target");
        assert_eq!(mem.read_u32(8).unwrap(), 6);
    }

    #[test]
    fn test_path_filestat_get_follow_flag() {
        let mut host = MockHostFs::new();
        host.expect_stat().never();
        host.expect_lstat()
            .times(1)
            .returning(|_| Ok(FileInfo { is_symlink: true, ino: 5, ..Default::default() }));
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        ctx.path_filestat_get(&mut mem, 3, 0, 64, 4, 0).unwrap();
        assert_eq!(mem.read_u64(8).unwrap(), 5);
        assert_eq!(mem.read_u64(16).unwrap(), FileType::SymbolicLink.raw() as u64);
    }

    fn escaping_link(mut host: MockHostFs) -> Context {
        host.expect_real_path()
            .with(eq(Path::new("/real/sandbox/link")))
            .returning(|_| Ok(PathBuf::from("/outside/secret")));
        preopened(host)
    }

    #[test]
    fn test_path_open_without_follow_rejects_symlink() {
        let mut host = MockHostFs::new();
        host.expect_lstat()
            .with(eq(Path::new("/real/sandbox/link")))
            .returning(|_| Ok(FileInfo { is_symlink: true, ..Default::default() }));
        host.expect_open().never();
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        assert_eq!(errno(ctx.path_open(&mut mem, 3, 0, 64, 4, 0, 0, 0, 0, 0)), Errno::Loop);
        assert_eq!(ctx.fds().len(), 4);
    }

    #[test]
    fn test_path_filestat_get_follow_escape() {
        let mut host = MockHostFs::new();
        host.expect_stat().never();
        let mut ctx = escaping_link(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        let follow = LookupFlags::SYMLINK_FOLLOW.bits();
        let result = ctx.path_filestat_get(&mut mem, 3, follow, 64, 4, 0);
        assert_eq!(errno(result), Errno::NotCapable);
    }

    #[test]
    fn test_path_filestat_set_times_follow_escape() {
        let mut host = MockHostFs::new();
        host.expect_utime().never();
        let mut ctx = escaping_link(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        let follow = LookupFlags::SYMLINK_FOLLOW.bits();
        let fst = FstFlags::MTIM.bits() as u32;
        let result = ctx.path_filestat_set_times(&mut mem, 3, follow, 64, 4, 0, 1, fst);
        assert_eq!(errno(result), Errno::NotCapable);
    }

    #[test]
    fn test_path_filestat_set_times_on_link_is_notsup() {
        let mut host = MockHostFs::new();
        host.expect_lstat()
            .with(eq(Path::new("/real/sandbox/link")))
            .returning(|_| Ok(FileInfo { is_symlink: true, ..Default::default() }));
        host.expect_utime().never();
        let mut ctx = preopened(host);

        let mut bytes = guest_memory("link");
        let mut mem = GuestMemory::new(&mut bytes);
        let fst = FstFlags::MTIM.bits() as u32;
        let result = ctx.path_filestat_set_times(&mut mem, 3, 0, 64, 4, 0, 1, fst);
        assert_eq!(errno(result), Errno::NotSup);
    }
}
