// proc_*, sched_*, random_*, poll_* and sock_* syscalls

use crate::wasi::context::Context;
use crate::wasi::error::{ExitSignal, WasiResult};
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::Errno;
use tracing::info;

impl Context {
    /// End the guest. Terminates the host process when `exit_on_return` is
    /// set; otherwise unwinds to `start` with an `ExitSignal`.
    pub fn proc_exit(&mut self, _mem: &mut GuestMemory<'_>, code: u32) -> WasiResult<()> {
        let code = code as i32;
        if self.exit_on_return {
            info!(code, "guest requested process exit");
            std::process::exit(code);
        }
        Err(ExitSignal(code).into())
    }

    pub fn proc_raise(&mut self, _mem: &mut GuestMemory<'_>, _signal: u32) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn sched_yield(&mut self, _mem: &mut GuestMemory<'_>) -> WasiResult<()> {
        Ok(())
    }

    pub fn random_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        buf_ptr: u32,
        buf_len: u32,
    ) -> WasiResult<()> {
        let buf = mem.slice_mut(buf_ptr, buf_len)?;
        self.host.fill_random(buf)?;
        Ok(())
    }

    pub fn poll_oneoff(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _in_ptr: u32,
        _out_ptr: u32,
        _nsubscriptions: u32,
        _nevents_ptr: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn sock_accept(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _flags: u32,
        _fd_ptr: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn sock_recv(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _ri_data: u32,
        _ri_data_len: u32,
        _ri_flags: u32,
        _ro_datalen_ptr: u32,
        _ro_flags_ptr: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn sock_send(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _si_data: u32,
        _si_data_len: u32,
        _si_flags: u32,
        _so_datalen_ptr: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }

    pub fn sock_shutdown(
        &mut self,
        _mem: &mut GuestMemory<'_>,
        _fd: u32,
        _how: u32,
    ) -> WasiResult<()> {
        Err(Errno::NoSys.into())
    }
}
