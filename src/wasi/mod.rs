// WASI module - wasi_snapshot_preview1 syscall layer
//
// A `Context` holds the guest's args, environment and descriptor table and
// serves the snapshot_preview1 import table to a wasmtime instance. Every
// syscall resolves guest offsets against the bound linear memory and forwards
// to a `HostFs`.

pub mod config;
pub mod context;
pub mod error;
pub mod fd_table;
pub mod instance;
pub mod linker;
pub mod memory;
pub mod path;
pub mod syscalls;
pub mod types;

pub use config::WasiConfig;
pub use context::{Context, WasiView};
pub use error::{ContextError, ExitSignal, WasiError, WasiResult, to_wasi_errno, translate};
pub use fd_table::{FdTable, FileDescriptor};
pub use linker::{MODULE, SYSCALLS, add_to_linker};
pub use memory::GuestMemory;
pub use types::Errno;
