// WASI context: process state, descriptor table and bound memory

use crate::host::{HostFs, OsHost, STDERR_RID, STDIN_RID, STDOUT_RID};
use crate::wasi::config::WasiConfig;
use crate::wasi::error::{ContextError, WasiResult};
use crate::wasi::fd_table::{FdTable, FileDescriptor};
use crate::wasi::memory::GuestMemory;
use crate::wasi::path;
use std::path::{Path, PathBuf};
use tracing::debug;
use wasmtime::Memory;

/// State shared by every syscall of one guest instance.
///
/// Owns the descriptor table and the host, and borrows the guest's memory
/// once `start` or `initialize` has bound it.
pub struct Context {
    pub(crate) args: Vec<String>,
    pub(crate) env: Vec<String>,
    pub(crate) exit_on_return: bool,
    pub(crate) fds: FdTable,
    pub(crate) host: Box<dyn HostFs>,
    pub(crate) memory: Option<Memory>,
    pub(crate) started: bool,
}

/// Access to the `Context` stored inside a wasmtime store's data.
pub trait WasiView {
    fn ctx(&mut self) -> &mut Context;
}

impl WasiView for Context {
    fn ctx(&mut self) -> &mut Context {
        self
    }
}

impl Context {
    /// Build the context: stdio as descriptors 0-2, then one directory entry
    /// per preopen with its root canonicalized and its listing captured.
    pub fn new(config: WasiConfig, mut host: Box<dyn HostFs>) -> Result<Self, ContextError> {
        let mut fds = FdTable::new();
        fds.allocate(FileDescriptor::stdio(config.stdin.unwrap_or(STDIN_RID)));
        fds.allocate(FileDescriptor::stdio(config.stdout.unwrap_or(STDOUT_RID)));
        fds.allocate(FileDescriptor::stdio(config.stderr.unwrap_or(STDERR_RID)));

        for (virtual_path, real) in config.preopens {
            let root = host.real_path(&real).map_err(|source| ContextError::Preopen {
                virtual_path: virtual_path.clone(),
                source,
            })?;
            let entries = host.read_dir(&root).map_err(|source| ContextError::Preopen {
                virtual_path: virtual_path.clone(),
                source,
            })?;

            debug!(virtual_path = %virtual_path, root = %root.display(), "preopened directory");
            fds.allocate(FileDescriptor::preopen(virtual_path, root, entries));
        }

        let env = config.env.iter().map(|(key, value)| format!("{key}={value}")).collect();

        Ok(Self {
            args: config.args,
            env,
            exit_on_return: config.exit_on_return,
            fds,
            host,
            memory: None,
            started: false,
        })
    }

    /// Context backed by the real filesystem and process streams
    pub fn with_os_host(config: WasiConfig) -> Result<Self, ContextError> {
        Self::new(config, Box::new(OsHost::new()))
    }

    pub fn fds(&self) -> &FdTable {
        &self.fds
    }

    pub fn host_mut(&mut self) -> &mut dyn HostFs {
        self.host.as_mut()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The memory bound by `start`/`initialize`
    pub fn bound_memory(&self) -> Result<Memory, ContextError> {
        self.memory.ok_or(ContextError::Unbound)
    }

    /// Read a guest path and resolve it inside descriptor `fd`'s root.
    ///
    /// Symlinks in the parent directories are always resolved on the host and
    /// the result must stay under the root. With `follow` the final
    /// component is resolved too; otherwise it is left as the link itself.
    pub(crate) fn resolve_at(
        &mut self,
        mem: &GuestMemory<'_>,
        fd: u32,
        path_ptr: u32,
        path_len: u32,
        follow: bool,
    ) -> WasiResult<PathBuf> {
        let root = self.fds.get(fd)?.path()?.to_path_buf();
        let guest_path = mem.read_string(path_ptr, path_len)?;
        let lexical = path::resolve_contained(&root, &guest_path)?;

        let real = if follow || lexical == root {
            real_path_lenient(self.host.as_mut(), &lexical)
        } else {
            match (lexical.parent(), lexical.file_name()) {
                (Some(parent), Some(name)) => {
                    real_path_lenient(self.host.as_mut(), parent).map(|real| real.join(name))
                }
                _ => None,
            }
        };

        let resolved = real.unwrap_or(lexical);
        path::ensure_contained(&root, &resolved)?;
        Ok(resolved)
    }
}

/// Canonical form of a path that may not exist yet: the real path of its
/// deepest existing ancestor joined with the remaining names.
fn real_path_lenient(host: &mut dyn HostFs, path: &Path) -> Option<PathBuf> {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(real) = host.real_path(current) {
            return Some(missing.iter().rev().fold(real, |acc: PathBuf, name| acc.join(name)));
        }
        missing.push(current.file_name()?);
        current = current.parent()?;
    }
}
