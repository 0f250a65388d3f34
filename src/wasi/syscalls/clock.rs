// clock_* syscalls

use crate::wasi::context::Context;
use crate::wasi::error::WasiResult;
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::ClockId;

const REALTIME_RESOLUTION_NS: u64 = 1_000_000;
const MONOTONIC_RESOLUTION_NS: u64 = 1_000;

impl Context {
    pub fn clock_res_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        id: u32,
        res_ptr: u32,
    ) -> WasiResult<()> {
        let resolution = match ClockId::try_from(id)? {
            ClockId::Realtime => REALTIME_RESOLUTION_NS,
            ClockId::Monotonic | ClockId::ProcessCputime | ClockId::ThreadCputime => {
                MONOTONIC_RESOLUTION_NS
            }
        };
        mem.write_u64(res_ptr, resolution)
    }

    pub fn clock_time_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        id: u32,
        _precision: u64,
        time_ptr: u32,
    ) -> WasiResult<()> {
        let time = match ClockId::try_from(id)? {
            ClockId::Realtime => {
                let now = self.host.wall_clock();
                now.timestamp_nanos_opt().map(|ns| ns.max(0) as u64).unwrap_or(0)
            }
            ClockId::Monotonic | ClockId::ProcessCputime | ClockId::ThreadCputime => {
                // Whole seconds plus microseconds, so the 1us resolution holds
                let elapsed = self.host.monotonic_clock();
                elapsed.as_secs() * 1_000_000_000 + u64::from(elapsed.subsec_micros()) * 1_000
            }
        };
        mem.write_u64(time_ptr, time)
    }
}
