// WASI error handling and errno mapping

use crate::host::{HostError, HostErrorKind};
use crate::wasi::types::Errno;
use thiserror::Error;

pub type WasiResult<T> = Result<T, WasiError>;

/// Non-local exit requested by the guest through `proc_exit`.
///
/// Never translated into an errno: it unwinds out of guest execution and is
/// caught by `Context::start`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("guest exited with code {0}")]
pub struct ExitSignal(pub i32);

impl ExitSignal {
    pub fn code(&self) -> i32 {
        self.0
    }
}

/// Failure raised inside a syscall body.
#[derive(Error, Debug)]
pub enum WasiError {
    /// A host operation failed
    #[error(transparent)]
    Host(#[from] HostError),

    /// The syscall decided on a specific errno
    #[error("{0}")]
    Errno(Errno),

    /// The guest asked to exit
    #[error(transparent)]
    Exit(#[from] ExitSignal),
}

impl From<Errno> for WasiError {
    fn from(errno: Errno) -> Self {
        WasiError::Errno(errno)
    }
}

/// Fatal embedding misuse. Raised by construction and by start/initialize,
/// never returned to the guest.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("WebAssembly instance has already started")]
    AlreadyStarted,

    #[error("WebAssembly instance must provide a memory export")]
    MissingMemory,

    #[error("WebAssembly instance export _start must be a function")]
    StartNotFunction,

    #[error("WebAssembly instance export _start must not be a function")]
    StartIsFunction,

    #[error("WebAssembly instance export _initialize must not be a function")]
    InitializeIsFunction,

    #[error("WebAssembly instance export _initialize must be a function or not be defined")]
    InitializeNotFunction,

    #[error("guest memory is not bound; call start or initialize first")]
    Unbound,

    #[error("failed to preopen {virtual_path}: {source}")]
    Preopen { virtual_path: String, source: HostError },

    #[error("guest execution failed: {0:#}")]
    Trap(wasmtime::Error),
}

/// Map a host failure kind to its errno.
pub fn host_errno(kind: HostErrorKind) -> Errno {
    match kind {
        HostErrorKind::NotFound => Errno::NoEnt,
        HostErrorKind::PermissionDenied => Errno::Acces,
        HostErrorKind::ConnectionRefused => Errno::ConnRefused,
        HostErrorKind::ConnectionReset => Errno::ConnReset,
        HostErrorKind::ConnectionAborted => Errno::ConnAborted,
        HostErrorKind::NotConnected => Errno::NotConn,
        HostErrorKind::AddrInUse => Errno::AddrInUse,
        HostErrorKind::AddrNotAvailable => Errno::AddrNotAvail,
        HostErrorKind::BrokenPipe => Errno::Pipe,
        HostErrorKind::InvalidData => Errno::Inval,
        HostErrorKind::TimedOut => Errno::TimedOut,
        HostErrorKind::Interrupted => Errno::Intr,
        HostErrorKind::BadResource => Errno::BadF,
        HostErrorKind::Busy => Errno::Busy,
        HostErrorKind::AlreadyExists => Errno::Exist,
        HostErrorKind::NotADirectory => Errno::NotDir,
        HostErrorKind::IsADirectory => Errno::IsDir,
        HostErrorKind::DirectoryNotEmpty => Errno::NotEmpty,
        HostErrorKind::Other => Errno::Inval,
    }
}

/// Map a syscall error to the errno handed to the guest.
///
/// Returns `None` for an exit signal, which must never become an errno.
pub fn to_wasi_errno(err: &WasiError) -> Option<Errno> {
    match err {
        WasiError::Host(err) => Some(host_errno(err.kind())),
        WasiError::Errno(errno) => Some(*errno),
        WasiError::Exit(_) => None,
    }
}

/// The adapter every syscall result passes through on its way to the guest.
pub fn translate(result: WasiResult<()>) -> Result<Errno, ExitSignal> {
    match result {
        Ok(()) => Ok(Errno::Success),
        Err(WasiError::Exit(signal)) => Err(signal),
        Err(err) => Ok(to_wasi_errno(&err).unwrap_or(Errno::Inval)),
    }
}
