// wasi_snapshot_preview1 import table for wasmtime

use crate::wasi::context::{Context, WasiView};
use crate::wasi::error::{WasiResult, translate};
use crate::wasi::memory::GuestMemory;
use wasmtime::{Caller, Linker};

/// Import module name every syscall is registered under.
pub const MODULE: &str = "wasi_snapshot_preview1";

/// Every syscall name registered by [`add_to_linker`].
pub const SYSCALLS: &[&str] = &[
    "args_get",
    "args_sizes_get",
    "clock_res_get",
    "clock_time_get",
    "environ_get",
    "environ_sizes_get",
    "fd_advise",
    "fd_allocate",
    "fd_close",
    "fd_datasync",
    "fd_fdstat_get",
    "fd_fdstat_set_flags",
    "fd_fdstat_set_rights",
    "fd_filestat_get",
    "fd_filestat_set_size",
    "fd_filestat_set_times",
    "fd_pread",
    "fd_prestat_dir_name",
    "fd_prestat_get",
    "fd_pwrite",
    "fd_read",
    "fd_readdir",
    "fd_renumber",
    "fd_seek",
    "fd_sync",
    "fd_tell",
    "fd_write",
    "path_create_directory",
    "path_filestat_get",
    "path_filestat_set_times",
    "path_link",
    "path_open",
    "path_readlink",
    "path_remove_directory",
    "path_rename",
    "path_symlink",
    "path_unlink_file",
    "poll_oneoff",
    "proc_exit",
    "proc_raise",
    "random_get",
    "sched_yield",
    "sock_accept",
    "sock_recv",
    "sock_send",
    "sock_shutdown",
];

/// Run one syscall body against the bound memory and hand its errno back.
///
/// The only error that escapes to wasmtime is an `ExitSignal` (or use of an
/// unbound context); everything else becomes an errno.
fn dispatch<T, F>(caller: &mut Caller<'_, T>, name: &'static str, body: F) -> wasmtime::Result<i32>
where
    T: WasiView + 'static,
    F: FnOnce(&mut Context, &mut GuestMemory<'_>) -> WasiResult<()>,
{
    let memory = caller.data_mut().ctx().bound_memory()?;
    let (bytes, data) = memory.data_and_store_mut(&mut *caller);
    let mut mem = GuestMemory::new(bytes);

    match translate(body(data.ctx(), &mut mem)) {
        Ok(errno) => {
            tracing::trace!(syscall = name, errno = %errno, "syscall");
            Ok(i32::from(errno.raw()))
        }
        Err(exit) => {
            tracing::debug!(syscall = name, code = exit.code(), "guest exit");
            Err(wasmtime::Error::new(exit))
        }
    }
}

/// Register the full `wasi_snapshot_preview1` import table.
pub fn add_to_linker<T: WasiView + 'static>(linker: &mut Linker<T>) -> wasmtime::Result<()> {
    // args / environ
    linker.func_wrap(MODULE, "args_get", |mut caller: Caller<'_, T>, argv: i32, argv_buf: i32| {
        dispatch(&mut caller, "args_get", |ctx, mem| {
            ctx.args_get(mem, argv as u32, argv_buf as u32)
        })
    })?;
    linker.func_wrap(MODULE, "args_sizes_get", |mut caller: Caller<'_, T>, argc: i32, size: i32| {
        dispatch(&mut caller, "args_sizes_get", |ctx, mem| {
            ctx.args_sizes_get(mem, argc as u32, size as u32)
        })
    })?;
    linker.func_wrap(MODULE, "environ_get", |mut caller: Caller<'_, T>, env: i32, env_buf: i32| {
        dispatch(&mut caller, "environ_get", |ctx, mem| {
            ctx.environ_get(mem, env as u32, env_buf as u32)
        })
    })?;
    linker.func_wrap(
        MODULE,
        "environ_sizes_get",
        |mut caller: Caller<'_, T>, count: i32, size: i32| {
            dispatch(&mut caller, "environ_sizes_get", |ctx, mem| {
                ctx.environ_sizes_get(mem, count as u32, size as u32)
            })
        },
    )?;

    // clock
    linker.func_wrap(MODULE, "clock_res_get", |mut caller: Caller<'_, T>, id: i32, res: i32| {
        dispatch(&mut caller, "clock_res_get", |ctx, mem| {
            ctx.clock_res_get(mem, id as u32, res as u32)
        })
    })?;
    linker.func_wrap(
        MODULE,
        "clock_time_get",
        |mut caller: Caller<'_, T>, id: i32, precision: i64, time: i32| {
            dispatch(&mut caller, "clock_time_get", |ctx, mem| {
                ctx.clock_time_get(mem, id as u32, precision as u64, time as u32)
            })
        },
    )?;

    // fd
    linker.func_wrap(
        MODULE,
        "fd_advise",
        |mut caller: Caller<'_, T>, fd: i32, offset: i64, len: i64, advice: i32| {
            dispatch(&mut caller, "fd_advise", |ctx, mem| {
                ctx.fd_advise(mem, fd as u32, offset as u64, len as u64, advice as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_allocate",
        |mut caller: Caller<'_, T>, fd: i32, offset: i64, len: i64| {
            dispatch(&mut caller, "fd_allocate", |ctx, mem| {
                ctx.fd_allocate(mem, fd as u32, offset as u64, len as u64)
            })
        },
    )?;
    linker.func_wrap(MODULE, "fd_close", |mut caller: Caller<'_, T>, fd: i32| {
        dispatch(&mut caller, "fd_close", |ctx, mem| ctx.fd_close(mem, fd as u32))
    })?;
    linker.func_wrap(MODULE, "fd_datasync", |mut caller: Caller<'_, T>, fd: i32| {
        dispatch(&mut caller, "fd_datasync", |ctx, mem| ctx.fd_datasync(mem, fd as u32))
    })?;
    linker.func_wrap(MODULE, "fd_fdstat_get", |mut caller: Caller<'_, T>, fd: i32, stat: i32| {
        dispatch(&mut caller, "fd_fdstat_get", |ctx, mem| {
            ctx.fd_fdstat_get(mem, fd as u32, stat as u32)
        })
    })?;
    linker.func_wrap(
        MODULE,
        "fd_fdstat_set_flags",
        |mut caller: Caller<'_, T>, fd: i32, flags: i32| {
            dispatch(&mut caller, "fd_fdstat_set_flags", |ctx, mem| {
                ctx.fd_fdstat_set_flags(mem, fd as u32, flags as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_fdstat_set_rights",
        |mut caller: Caller<'_, T>, fd: i32, base: i64, inheriting: i64| {
            dispatch(&mut caller, "fd_fdstat_set_rights", |ctx, mem| {
                ctx.fd_fdstat_set_rights(mem, fd as u32, base as u64, inheriting as u64)
            })
        },
    )?;
    linker.func_wrap(MODULE, "fd_filestat_get", |mut caller: Caller<'_, T>, fd: i32, buf: i32| {
        dispatch(&mut caller, "fd_filestat_get", |ctx, mem| {
            ctx.fd_filestat_get(mem, fd as u32, buf as u32)
        })
    })?;
    linker.func_wrap(
        MODULE,
        "fd_filestat_set_size",
        |mut caller: Caller<'_, T>, fd: i32, size: i64| {
            dispatch(&mut caller, "fd_filestat_set_size", |ctx, mem| {
                ctx.fd_filestat_set_size(mem, fd as u32, size as u64)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_filestat_set_times",
        |mut caller: Caller<'_, T>, fd: i32, atim: i64, mtim: i64, flags: i32| {
            dispatch(&mut caller, "fd_filestat_set_times", |ctx, mem| {
                ctx.fd_filestat_set_times(
                    mem,
                    fd as u32,
                    atim as u64,
                    mtim as u64,
                    flags as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_pread",
        |mut caller: Caller<'_, T>, fd: i32, iovs: i32, iovs_len: i32, offset: i64, nread: i32| {
            dispatch(&mut caller, "fd_pread", |ctx, mem| {
                ctx.fd_pread(
                    mem,
                    fd as u32,
                    iovs as u32,
                    iovs_len as u32,
                    offset as u64,
                    nread as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_prestat_dir_name",
        |mut caller: Caller<'_, T>, fd: i32, path: i32, path_len: i32| {
            dispatch(&mut caller, "fd_prestat_dir_name", |ctx, mem| {
                ctx.fd_prestat_dir_name(mem, fd as u32, path as u32, path_len as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_prestat_get",
        |mut caller: Caller<'_, T>, fd: i32, prestat: i32| {
            dispatch(&mut caller, "fd_prestat_get", |ctx, mem| {
                ctx.fd_prestat_get(mem, fd as u32, prestat as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_pwrite",
        |mut caller: Caller<'_, T>,
         fd: i32,
         iovs: i32,
         iovs_len: i32,
         offset: i64,
         nwritten: i32| {
            dispatch(&mut caller, "fd_pwrite", |ctx, mem| {
                ctx.fd_pwrite(
                    mem,
                    fd as u32,
                    iovs as u32,
                    iovs_len as u32,
                    offset as u64,
                    nwritten as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_read",
        |mut caller: Caller<'_, T>, fd: i32, iovs: i32, iovs_len: i32, nread: i32| {
            dispatch(&mut caller, "fd_read", |ctx, mem| {
                ctx.fd_read(mem, fd as u32, iovs as u32, iovs_len as u32, nread as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "fd_readdir",
        |mut caller: Caller<'_, T>, fd: i32, buf: i32, buf_len: i32, cookie: i64, bufused: i32| {
            dispatch(&mut caller, "fd_readdir", |ctx, mem| {
                ctx.fd_readdir(
                    mem,
                    fd as u32,
                    buf as u32,
                    buf_len as u32,
                    cookie as u64,
                    bufused as u32,
                )
            })
        },
    )?;
    linker.func_wrap(MODULE, "fd_renumber", |mut caller: Caller<'_, T>, fd: i32, to: i32| {
        dispatch(&mut caller, "fd_renumber", |ctx, mem| {
            ctx.fd_renumber(mem, fd as u32, to as u32)
        })
    })?;
    linker.func_wrap(
        MODULE,
        "fd_seek",
        |mut caller: Caller<'_, T>, fd: i32, offset: i64, whence: i32, newoffset: i32| {
            dispatch(&mut caller, "fd_seek", |ctx, mem| {
                ctx.fd_seek(mem, fd as u32, offset, whence as u32, newoffset as u32)
            })
        },
    )?;
    linker.func_wrap(MODULE, "fd_sync", |mut caller: Caller<'_, T>, fd: i32| {
        dispatch(&mut caller, "fd_sync", |ctx, mem| ctx.fd_sync(mem, fd as u32))
    })?;
    linker.func_wrap(MODULE, "fd_tell", |mut caller: Caller<'_, T>, fd: i32, offset: i32| {
        dispatch(&mut caller, "fd_tell", |ctx, mem| ctx.fd_tell(mem, fd as u32, offset as u32))
    })?;
    linker.func_wrap(
        MODULE,
        "fd_write",
        |mut caller: Caller<'_, T>, fd: i32, iovs: i32, iovs_len: i32, nwritten: i32| {
            dispatch(&mut caller, "fd_write", |ctx, mem| {
                ctx.fd_write(mem, fd as u32, iovs as u32, iovs_len as u32, nwritten as u32)
            })
        },
    )?;

    // path
    linker.func_wrap(
        MODULE,
        "path_create_directory",
        |mut caller: Caller<'_, T>, fd: i32, path: i32, path_len: i32| {
            dispatch(&mut caller, "path_create_directory", |ctx, mem| {
                ctx.path_create_directory(mem, fd as u32, path as u32, path_len as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_filestat_get",
        |mut caller: Caller<'_, T>, fd: i32, flags: i32, path: i32, path_len: i32, buf: i32| {
            dispatch(&mut caller, "path_filestat_get", |ctx, mem| {
                ctx.path_filestat_get(
                    mem,
                    fd as u32,
                    flags as u32,
                    path as u32,
                    path_len as u32,
                    buf as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_filestat_set_times",
        |mut caller: Caller<'_, T>,
         fd: i32,
         flags: i32,
         path: i32,
         path_len: i32,
         atim: i64,
         mtim: i64,
         fst_flags: i32| {
            dispatch(&mut caller, "path_filestat_set_times", |ctx, mem| {
                ctx.path_filestat_set_times(
                    mem,
                    fd as u32,
                    flags as u32,
                    path as u32,
                    path_len as u32,
                    atim as u64,
                    mtim as u64,
                    fst_flags as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_link",
        |mut caller: Caller<'_, T>,
         old_fd: i32,
         old_flags: i32,
         old_path: i32,
         old_path_len: i32,
         new_fd: i32,
         new_path: i32,
         new_path_len: i32| {
            dispatch(&mut caller, "path_link", |ctx, mem| {
                ctx.path_link(
                    mem,
                    old_fd as u32,
                    old_flags as u32,
                    old_path as u32,
                    old_path_len as u32,
                    new_fd as u32,
                    new_path as u32,
                    new_path_len as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_open",
        |mut caller: Caller<'_, T>,
         fd: i32,
         dirflags: i32,
         path: i32,
         path_len: i32,
         oflags: i32,
         rights_base: i64,
         rights_inheriting: i64,
         fdflags: i32,
         opened_fd: i32| {
            dispatch(&mut caller, "path_open", |ctx, mem| {
                ctx.path_open(
                    mem,
                    fd as u32,
                    dirflags as u32,
                    path as u32,
                    path_len as u32,
                    oflags as u32,
                    rights_base as u64,
                    rights_inheriting as u64,
                    fdflags as u32,
                    opened_fd as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_readlink",
        |mut caller: Caller<'_, T>,
         fd: i32,
         path: i32,
         path_len: i32,
         buf: i32,
         buf_len: i32,
         bufused: i32| {
            dispatch(&mut caller, "path_readlink", |ctx, mem| {
                ctx.path_readlink(
                    mem,
                    fd as u32,
                    path as u32,
                    path_len as u32,
                    buf as u32,
                    buf_len as u32,
                    bufused as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_remove_directory",
        |mut caller: Caller<'_, T>, fd: i32, path: i32, path_len: i32| {
            dispatch(&mut caller, "path_remove_directory", |ctx, mem| {
                ctx.path_remove_directory(mem, fd as u32, path as u32, path_len as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_rename",
        |mut caller: Caller<'_, T>,
         fd: i32,
         old_path: i32,
         old_path_len: i32,
         new_fd: i32,
         new_path: i32,
         new_path_len: i32| {
            dispatch(&mut caller, "path_rename", |ctx, mem| {
                ctx.path_rename(
                    mem,
                    fd as u32,
                    old_path as u32,
                    old_path_len as u32,
                    new_fd as u32,
                    new_path as u32,
                    new_path_len as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_symlink",
        |mut caller: Caller<'_, T>,
         old_path: i32,
         old_path_len: i32,
         fd: i32,
         new_path: i32,
         new_path_len: i32| {
            dispatch(&mut caller, "path_symlink", |ctx, mem| {
                ctx.path_symlink(
                    mem,
                    old_path as u32,
                    old_path_len as u32,
                    fd as u32,
                    new_path as u32,
                    new_path_len as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "path_unlink_file",
        |mut caller: Caller<'_, T>, fd: i32, path: i32, path_len: i32| {
            dispatch(&mut caller, "path_unlink_file", |ctx, mem| {
                ctx.path_unlink_file(mem, fd as u32, path as u32, path_len as u32)
            })
        },
    )?;

    // poll / proc / sched / random
    linker.func_wrap(
        MODULE,
        "poll_oneoff",
        |mut caller: Caller<'_, T>, input: i32, output: i32, nsubscriptions: i32, nevents: i32| {
            dispatch(&mut caller, "poll_oneoff", |ctx, mem| {
                ctx.poll_oneoff(
                    mem,
                    input as u32,
                    output as u32,
                    nsubscriptions as u32,
                    nevents as u32,
                )
            })
        },
    )?;
    linker.func_wrap(MODULE, "proc_exit", |mut caller: Caller<'_, T>, code: i32| {
        dispatch(&mut caller, "proc_exit", |ctx, mem| ctx.proc_exit(mem, code as u32)).map(|_| ())
    })?;
    linker.func_wrap(MODULE, "proc_raise", |mut caller: Caller<'_, T>, signal: i32| {
        dispatch(&mut caller, "proc_raise", |ctx, mem| ctx.proc_raise(mem, signal as u32))
    })?;
    linker.func_wrap(MODULE, "sched_yield", |mut caller: Caller<'_, T>| {
        dispatch(&mut caller, "sched_yield", |ctx, mem| ctx.sched_yield(mem))
    })?;
    linker.func_wrap(MODULE, "random_get", |mut caller: Caller<'_, T>, buf: i32, buf_len: i32| {
        dispatch(&mut caller, "random_get", |ctx, mem| {
            ctx.random_get(mem, buf as u32, buf_len as u32)
        })
    })?;

    // sock
    linker.func_wrap(
        MODULE,
        "sock_accept",
        |mut caller: Caller<'_, T>, fd: i32, flags: i32, result_fd: i32| {
            dispatch(&mut caller, "sock_accept", |ctx, mem| {
                ctx.sock_accept(mem, fd as u32, flags as u32, result_fd as u32)
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "sock_recv",
        |mut caller: Caller<'_, T>,
         fd: i32,
         ri_data: i32,
         ri_data_len: i32,
         ri_flags: i32,
         ro_datalen: i32,
         ro_flags: i32| {
            dispatch(&mut caller, "sock_recv", |ctx, mem| {
                ctx.sock_recv(
                    mem,
                    fd as u32,
                    ri_data as u32,
                    ri_data_len as u32,
                    ri_flags as u32,
                    ro_datalen as u32,
                    ro_flags as u32,
                )
            })
        },
    )?;
    linker.func_wrap(
        MODULE,
        "sock_send",
        |mut caller: Caller<'_, T>,
         fd: i32,
         si_data: i32,
         si_data_len: i32,
         si_flags: i32,
         so_datalen: i32| {
            dispatch(&mut caller, "sock_send", |ctx, mem| {
                ctx.sock_send(
                    mem,
                    fd as u32,
                    si_data as u32,
                    si_data_len as u32,
                    si_flags as u32,
                    so_datalen as u32,
                )
            })
        },
    )?;
    linker.func_wrap(MODULE, "sock_shutdown", |mut caller: Caller<'_, T>, fd: i32, how: i32| {
        dispatch(&mut caller, "sock_shutdown", |ctx, mem| {
            ctx.sock_shutdown(mem, fd as u32, how as u32)
        })
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHostFs;
    use crate::wasi::config::WasiConfig;
    use wasmtime::{Engine, Store};

    #[test]
    fn test_syscalls_are_unique() {
        let mut names = SYSCALLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SYSCALLS.len());
        assert_eq!(SYSCALLS.len(), 46);
    }

    #[test]
    fn test_add_to_linker_registers_every_syscall() {
        let engine = Engine::default();
        let mut linker: Linker<Context> = Linker::new(&engine);
        add_to_linker(&mut linker).unwrap();

        let ctx = Context::new(WasiConfig::default(), Box::new(MockHostFs::new())).unwrap();
        let mut store = Store::new(&engine, ctx);
        for name in SYSCALLS {
            assert!(linker.get(&mut store, MODULE, name).is_some(), "missing {name}");
        }
    }
}
