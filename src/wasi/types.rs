// wasi_snapshot_preview1 ABI constants and flag sets

use std::fmt;

pub const PREOPENTYPE_DIR: u8 = 0;

pub const IOVEC_SIZE: u32 = 8;
pub const PRESTAT_SIZE: u32 = 8;
pub const FDSTAT_SIZE: u32 = 24;
pub const FILESTAT_SIZE: u32 = 64;
pub const DIRENT_HEADER_SIZE: usize = 24;

/// Errno values returned to the guest.
///
/// See: https://github.com/WebAssembly/WASI/blob/main/legacy/preview1/docs.md
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Errno {
    Success = 0,
    TooBig = 1,
    Acces = 2,
    AddrInUse = 3,
    AddrNotAvail = 4,
    AfNoSupport = 5,
    Again = 6,
    Already = 7,
    BadF = 8,
    BadMsg = 9,
    Busy = 10,
    Canceled = 11,
    Child = 12,
    ConnAborted = 13,
    ConnRefused = 14,
    ConnReset = 15,
    DeadLk = 16,
    DestAddrReq = 17,
    Dom = 18,
    DQuot = 19,
    Exist = 20,
    Fault = 21,
    FBig = 22,
    HostUnreach = 23,
    IdRm = 24,
    IlSeq = 25,
    InProgress = 26,
    Intr = 27,
    Inval = 28,
    Io = 29,
    IsConn = 30,
    IsDir = 31,
    Loop = 32,
    MFile = 33,
    MLink = 34,
    MsgSize = 35,
    Multihop = 36,
    NameTooLong = 37,
    NetDown = 38,
    NetReset = 39,
    NetUnreach = 40,
    NFile = 41,
    NoBufs = 42,
    NoDev = 43,
    NoEnt = 44,
    NoExec = 45,
    NoLck = 46,
    NoLink = 47,
    NoMem = 48,
    NoMsg = 49,
    NoProtoOpt = 50,
    NoSpc = 51,
    NoSys = 52,
    NotConn = 53,
    NotDir = 54,
    NotEmpty = 55,
    NotRecoverable = 56,
    NotSock = 57,
    NotSup = 58,
    NoTty = 59,
    NxIo = 60,
    Overflow = 61,
    OwnerDead = 62,
    Perm = 63,
    Pipe = 64,
    Proto = 65,
    ProtoNoSupport = 66,
    ProtoType = 67,
    Range = 68,
    RoFs = 69,
    SPipe = 70,
    Srch = 71,
    Stale = 72,
    TimedOut = 73,
    TxtBsy = 74,
    XDev = 75,
    NotCapable = 76,
}

impl Errno {
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Symbolic name as used by the WASI documents, e.g. `ENOENT`.
    pub fn name(self) -> &'static str {
        match self {
            Errno::Success => "ESUCCESS",
            Errno::TooBig => "E2BIG",
            Errno::Acces => "EACCES",
            Errno::AddrInUse => "EADDRINUSE",
            Errno::AddrNotAvail => "EADDRNOTAVAIL",
            Errno::AfNoSupport => "EAFNOSUPPORT",
            Errno::Again => "EAGAIN",
            Errno::Already => "EALREADY",
            Errno::BadF => "EBADF",
            Errno::BadMsg => "EBADMSG",
            Errno::Busy => "EBUSY",
            Errno::Canceled => "ECANCELED",
            Errno::Child => "ECHILD",
            Errno::ConnAborted => "ECONNABORTED",
            Errno::ConnRefused => "ECONNREFUSED",
            Errno::ConnReset => "ECONNRESET",
            Errno::DeadLk => "EDEADLK",
            Errno::DestAddrReq => "EDESTADDRREQ",
            Errno::Dom => "EDOM",
            Errno::DQuot => "EDQUOT",
            Errno::Exist => "EEXIST",
            Errno::Fault => "EFAULT",
            Errno::FBig => "EFBIG",
            Errno::HostUnreach => "EHOSTUNREACH",
            Errno::IdRm => "EIDRM",
            Errno::IlSeq => "EILSEQ",
            Errno::InProgress => "EINPROGRESS",
            Errno::Intr => "EINTR",
            Errno::Inval => "EINVAL",
            Errno::Io => "EIO",
            Errno::IsConn => "EISCONN",
            Errno::IsDir => "EISDIR",
            Errno::Loop => "ELOOP",
            Errno::MFile => "EMFILE",
            Errno::MLink => "EMLINK",
            Errno::MsgSize => "EMSGSIZE",
            Errno::Multihop => "EMULTIHOP",
            Errno::NameTooLong => "ENAMETOOLONG",
            Errno::NetDown => "ENETDOWN",
            Errno::NetReset => "ENETRESET",
            Errno::NetUnreach => "ENETUNREACH",
            Errno::NFile => "ENFILE",
            Errno::NoBufs => "ENOBUFS",
            Errno::NoDev => "ENODEV",
            Errno::NoEnt => "ENOENT",
            Errno::NoExec => "ENOEXEC",
            Errno::NoLck => "ENOLCK",
            Errno::NoLink => "ENOLINK",
            Errno::NoMem => "ENOMEM",
            Errno::NoMsg => "ENOMSG",
            Errno::NoProtoOpt => "ENOPROTOOPT",
            Errno::NoSpc => "ENOSPC",
            Errno::NoSys => "ENOSYS",
            Errno::NotConn => "ENOTCONN",
            Errno::NotDir => "ENOTDIR",
            Errno::NotEmpty => "ENOTEMPTY",
            Errno::NotRecoverable => "ENOTRECOVERABLE",
            Errno::NotSock => "ENOTSOCK",
            Errno::NotSup => "ENOTSUP",
            Errno::NoTty => "ENOTTY",
            Errno::NxIo => "ENXIO",
            Errno::Overflow => "EOVERFLOW",
            Errno::OwnerDead => "EOWNERDEAD",
            Errno::Perm => "EPERM",
            Errno::Pipe => "EPIPE",
            Errno::Proto => "EPROTO",
            Errno::ProtoNoSupport => "EPROTONOSUPPORT",
            Errno::ProtoType => "EPROTOTYPE",
            Errno::Range => "ERANGE",
            Errno::RoFs => "EROFS",
            Errno::SPipe => "ESPIPE",
            Errno::Srch => "ESRCH",
            Errno::Stale => "ESTALE",
            Errno::TimedOut => "ETIMEDOUT",
            Errno::TxtBsy => "ETXTBSY",
            Errno::XDev => "EXDEV",
            Errno::NotCapable => "ENOTCAPABLE",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.raw())
    }
}

/// Type of a file descriptor or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FileType {
    #[default]
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

impl FileType {
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Classify from host `is_file`/`is_directory`/`is_symlink` bits.
    pub fn classify(is_file: bool, is_directory: bool, is_symlink: bool) -> Self {
        if is_file {
            FileType::RegularFile
        } else if is_directory {
            FileType::Directory
        } else if is_symlink {
            FileType::SymbolicLink
        } else {
            FileType::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ClockId {
    Realtime = 0,
    Monotonic = 1,
    ProcessCputime = 2,
    ThreadCputime = 3,
}

impl TryFrom<u32> for ClockId {
    type Error = Errno;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(ClockId::Realtime),
            1 => Ok(ClockId::Monotonic),
            2 => Ok(ClockId::ProcessCputime),
            3 => Ok(ClockId::ThreadCputime),
            _ => Err(Errno::Inval),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl TryFrom<u32> for Whence {
    type Error = Errno;

    fn try_from(whence: u32) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Cur),
            2 => Ok(Whence::End),
            _ => Err(Errno::Inval),
        }
    }
}

bitflags::bitflags! {
    /// File descriptor flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FdFlags: u16 {
        const APPEND = 1 << 0;
        const DSYNC = 1 << 1;
        const NONBLOCK = 1 << 2;
        const RSYNC = 1 << 3;
        const SYNC = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Open flags for path_open.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OFlags: u16 {
        const CREAT = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCL = 1 << 2;
        const TRUNC = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Lookup flags for path operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LookupFlags: u32 {
        const SYMLINK_FOLLOW = 1 << 0;
    }
}

bitflags::bitflags! {
    /// Which timestamps to set in the filestat_set_times calls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FstFlags: u16 {
        const ATIM = 1 << 0;
        const ATIM_NOW = 1 << 1;
        const MTIM = 1 << 2;
        const MTIM_NOW = 1 << 3;
    }
}

bitflags::bitflags! {
    /// File descriptor rights.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Rights: u64 {
        const FD_DATASYNC = 1 << 0;
        const FD_READ = 1 << 1;
        const FD_SEEK = 1 << 2;
        const FD_FDSTAT_SET_FLAGS = 1 << 3;
        const FD_SYNC = 1 << 4;
        const FD_TELL = 1 << 5;
        const FD_WRITE = 1 << 6;
        const FD_ADVISE = 1 << 7;
        const FD_ALLOCATE = 1 << 8;
        const PATH_CREATE_DIRECTORY = 1 << 9;
        const PATH_CREATE_FILE = 1 << 10;
        const PATH_LINK_SOURCE = 1 << 11;
        const PATH_LINK_TARGET = 1 << 12;
        const PATH_OPEN = 1 << 13;
        const FD_READDIR = 1 << 14;
        const PATH_READLINK = 1 << 15;
        const PATH_RENAME_SOURCE = 1 << 16;
        const PATH_RENAME_TARGET = 1 << 17;
        const PATH_FILESTAT_GET = 1 << 18;
        const PATH_FILESTAT_SET_SIZE = 1 << 19;
        const PATH_FILESTAT_SET_TIMES = 1 << 20;
        const FD_FILESTAT_GET = 1 << 21;
        const FD_FILESTAT_SET_SIZE = 1 << 22;
        const FD_FILESTAT_SET_TIMES = 1 << 23;
        const PATH_SYMLINK = 1 << 24;
        const PATH_REMOVE_DIRECTORY = 1 << 25;
        const PATH_UNLINK_FILE = 1 << 26;
        const POLL_FD_READWRITE = 1 << 27;
        const SOCK_SHUTDOWN = 1 << 28;
        const SOCK_ACCEPT = 1 << 29;
    }
}

impl Rights {
    /// Rights that make path_open request read access.
    pub const READ_ACCESS: Rights = Rights::FD_READ.union(Rights::FD_READDIR);

    /// Rights that make path_open request write access.
    pub const WRITE_ACCESS: Rights = Rights::FD_DATASYNC
        .union(Rights::FD_WRITE)
        .union(Rights::FD_ALLOCATE)
        .union(Rights::FD_FILESTAT_SET_SIZE);
}
