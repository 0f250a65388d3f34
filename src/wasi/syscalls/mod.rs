// Syscall bodies, grouped by the snapshot_preview1 families.
//
// Every body is a `Context` method taking the guest memory view and raw ABI
// integers and returning `WasiResult<()>`. The linker turns that result into
// an errno through `error::translate`.

mod args;
mod clock;
mod fd;
mod misc;
mod path;

use crate::host::{FileInfo, HostFs};
use crate::wasi::error::WasiResult;
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::{Errno, FILESTAT_SIZE, FileType, FstFlags};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Nanoseconds since the epoch, 0 when the host has no timestamp.
fn nanos(time: Option<DateTime<Utc>>) -> u64 {
    time.and_then(|t| t.timestamp_nanos_opt()).map(|ns| ns.max(0) as u64).unwrap_or(0)
}

/// Marshal a filestat record: dev, ino, filetype, nlink, size, atim, mtim,
/// ctim; eight bytes each.
pub(crate) fn write_filestat(
    mem: &mut GuestMemory<'_>,
    ptr: u32,
    info: &FileInfo,
    file_type: FileType,
) -> WasiResult<()> {
    let mut record = [0u8; FILESTAT_SIZE as usize];
    record[0..8].copy_from_slice(&info.dev.to_le_bytes());
    record[8..16].copy_from_slice(&info.ino.to_le_bytes());
    record[16] = file_type.raw();
    record[24..32].copy_from_slice(&info.nlink.to_le_bytes());
    record[32..40].copy_from_slice(&info.size.to_le_bytes());
    record[40..48].copy_from_slice(&nanos(info.atime).to_le_bytes());
    record[48..56].copy_from_slice(&nanos(info.mtime).to_le_bytes());
    record[56..64].copy_from_slice(&nanos(info.birthtime).to_le_bytes());
    mem.write_bytes(ptr, &record)
}

/// Pick one timestamp: `now` wins, then `set` with the supplied value,
/// otherwise unchanged.
fn pick_time(
    host: &dyn HostFs,
    flags: FstFlags,
    set: FstFlags,
    now: FstFlags,
    value: u64,
) -> WasiResult<Option<DateTime<Utc>>> {
    if flags.contains(set) && flags.contains(now) {
        return Err(Errno::Inval.into());
    }
    if flags.contains(now) {
        return Ok(Some(host.wall_clock()));
    }
    if flags.contains(set) {
        let ns = i64::try_from(value).map_err(|_| Errno::Inval)?;
        return Ok(Some(DateTime::from_timestamp_nanos(ns)));
    }
    Ok(None)
}

/// Shared body of the two filestat_set_times calls.
pub(crate) fn set_times(
    host: &mut dyn HostFs,
    path: &Path,
    atim: u64,
    mtim: u64,
    flags: FstFlags,
) -> WasiResult<()> {
    let atime = pick_time(host, flags, FstFlags::ATIM, FstFlags::ATIM_NOW, atim)?;
    let mtime = pick_time(host, flags, FstFlags::MTIM, FstFlags::MTIM_NOW, mtim)?;
    if atime.is_none() && mtime.is_none() {
        return Ok(());
    }
    host.utime(path, atime, mtime)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHostFs;
    use crate::wasi::error::WasiError;
    use chrono::TimeZone;
    use mockall::predicate::{always, eq};

    #[test]
    fn test_nanos() {
        assert_eq!(nanos(None), 0);
        let t = Utc.timestamp_opt(2, 5).unwrap();
        assert_eq!(nanos(Some(t)), 2_000_000_005);
    }

    #[test]
    fn test_write_filestat_layout() {
        let info = FileInfo {
            dev: 7,
            ino: 8,
            is_file: true,
            nlink: 1,
            size: 5,
            mtime: Some(Utc.timestamp_opt(1, 0).unwrap()),
            ..Default::default()
        };
        let mut bytes = vec![0xffu8; 72];
        let mut mem = GuestMemory::new(&mut bytes);
        write_filestat(&mut mem, 8, &info, FileType::RegularFile).unwrap();

        assert_eq!(mem.read_u64(8).unwrap(), 7);
        assert_eq!(mem.read_u64(16).unwrap(), 8);
        assert_eq!(mem.read_u64(24).unwrap(), 4);
        assert_eq!(mem.read_u64(32).unwrap(), 1);
        assert_eq!(mem.read_u64(40).unwrap(), 5);
        assert_eq!(mem.read_u64(48).unwrap(), 0);
        assert_eq!(mem.read_u64(56).unwrap(), 1_000_000_000);
        assert_eq!(mem.read_u64(64).unwrap(), 0);
        assert_eq!(mem.slice(0, 8).unwrap(), &[0xff; 8]);
    }

    #[test]
    fn test_set_times_now_and_value() {
        let now = Utc.timestamp_opt(100, 0).unwrap();
        let mut host = MockHostFs::new();
        host.expect_wall_clock().returning(move || now);
        host.expect_utime()
            .with(always(), eq(Some(now)), eq(Some(Utc.timestamp_opt(3, 0).unwrap())))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let flags = FstFlags::ATIM_NOW | FstFlags::MTIM;
        set_times(&mut host, Path::new("/f"), 0, 3_000_000_000, flags).unwrap();
    }

    #[test]
    fn test_set_times_leaves_unselected_unchanged() {
        let mut host = MockHostFs::new();
        host.expect_utime()
            .with(always(), eq(None), eq(Some(Utc.timestamp_opt(0, 9).unwrap())))
            .times(1)
            .returning(|_, _, _| Ok(()));

        set_times(&mut host, Path::new("/f"), 1234, 9, FstFlags::MTIM).unwrap();
    }

    #[test]
    fn test_set_times_no_flags_skips_host() {
        let mut host = MockHostFs::new();
        host.expect_utime().never();
        set_times(&mut host, Path::new("/f"), 1, 2, FstFlags::empty()).unwrap();
    }

    #[test]
    fn test_set_times_conflicting_flags() {
        let mut host = MockHostFs::new();
        host.expect_utime().never();
        let flags = FstFlags::ATIM | FstFlags::ATIM_NOW;
        let result = set_times(&mut host, Path::new("/f"), 1, 2, flags);
        assert!(matches!(result, Err(WasiError::Errno(Errno::Inval))));
    }
}
