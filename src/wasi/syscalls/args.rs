// args_* and environ_* syscalls

use crate::wasi::context::Context;
use crate::wasi::error::WasiResult;
use crate::wasi::memory::GuestMemory;
use crate::wasi::types::Errno;

/// Write NUL-terminated strings at `buf_ptr` and their addresses at `ptrs_ptr`.
fn write_string_table(
    mem: &mut GuestMemory<'_>,
    items: &[String],
    ptrs_ptr: u32,
    buf_ptr: u32,
) -> WasiResult<()> {
    let mut offset = buf_ptr;
    for (i, item) in items.iter().enumerate() {
        let slot =
            (i as u32).checked_mul(4).and_then(|o| ptrs_ptr.checked_add(o)).ok_or(Errno::Fault)?;
        mem.write_u32(slot, offset)?;
        mem.write_bytes(offset, item.as_bytes())?;

        let end = offset.checked_add(item.len() as u32).ok_or(Errno::Fault)?;
        mem.write_u8(end, 0)?;
        offset = end.checked_add(1).ok_or(Errno::Fault)?;
    }
    Ok(())
}

/// Byte count of the string table including terminators
fn string_table_size(items: &[String]) -> u32 {
    items.iter().map(|item| item.len() as u32 + 1).sum()
}

impl Context {
    pub fn args_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        argv: u32,
        argv_buf: u32,
    ) -> WasiResult<()> {
        write_string_table(mem, &self.args, argv, argv_buf)
    }

    pub fn args_sizes_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        argc_ptr: u32,
        argv_buf_size_ptr: u32,
    ) -> WasiResult<()> {
        mem.write_u32(argc_ptr, self.args.len() as u32)?;
        mem.write_u32(argv_buf_size_ptr, string_table_size(&self.args))
    }

    pub fn environ_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        environ: u32,
        environ_buf: u32,
    ) -> WasiResult<()> {
        write_string_table(mem, &self.env, environ, environ_buf)
    }

    pub fn environ_sizes_get(
        &mut self,
        mem: &mut GuestMemory<'_>,
        environc_ptr: u32,
        environ_buf_size_ptr: u32,
    ) -> WasiResult<()> {
        mem.write_u32(environc_ptr, self.env.len() as u32)?;
        mem.write_u32(environ_buf_size_ptr, string_table_size(&self.env))
    }
}

#[cfg(test)]
mod tests {
    use crate::host::MockHostFs;
    use crate::wasi::config::WasiConfig;
    use crate::wasi::context::Context;
    use crate::wasi::error::WasiError;
    use crate::wasi::memory::GuestMemory;
    use crate::wasi::types::Errno;

    fn context(config: WasiConfig) -> Context {
        Context::new(config, Box::new(MockHostFs::new())).unwrap()
    }

    #[test]
    fn test_args_sizes_get() {
        let mut ctx = context(WasiConfig::default().with_args(["prog", "", "héllo"]));
        let mut bytes = vec![0u8; 16];
        let mut mem = GuestMemory::new(&mut bytes);

        ctx.args_sizes_get(&mut mem, 0, 4).unwrap();
        assert_eq!(mem.read_u32(0).unwrap(), 3);
        assert_eq!(mem.read_u32(4).unwrap(), 5 + 1 + 7);
    }

    #[test]
    fn test_args_get_layout() {
        let mut ctx = context(WasiConfig::default().with_args(["prog", "-v"]));
        let mut bytes = vec![0xaau8; 64];
        let mut mem = GuestMemory::new(&mut bytes);

        ctx.args_get(&mut mem, 0, 16).unwrap();
        assert_eq!(mem.read_u32(0).unwrap(), 16);
        assert_eq!(mem.read_u32(4).unwrap(), 21);
        assert_eq!(mem.slice(16, 8).unwrap(), b"prog\0-v\0");
    }

    #[test]
    fn test_environ_get_layout() {
        let mut ctx = context(WasiConfig::default().with_env("HOME", "/root").with_env("A", ""));
        let mut bytes = vec![0u8; 64];
        let mut mem = GuestMemory::new(&mut bytes);

        ctx.environ_sizes_get(&mut mem, 0, 4).unwrap();
        assert_eq!(mem.read_u32(0).unwrap(), 2);
        assert_eq!(mem.read_u32(4).unwrap(), 3 + 11);

        ctx.environ_get(&mut mem, 8, 32).unwrap();
        assert_eq!(mem.read_u32(8).unwrap(), 32);
        assert_eq!(mem.read_u32(12).unwrap(), 35);
        assert_eq!(mem.slice(32, 14).unwrap(), b"A=\0HOME=/root\0");
    }

    #[test]
    fn test_args_get_out_of_bounds() {
        let mut ctx = context(WasiConfig::default().with_args(["a-rather-long-argument"]));
        let mut bytes = vec![0u8; 16];
        let mut mem = GuestMemory::new(&mut bytes);
        assert!(matches!(ctx.args_get(&mut mem, 0, 8), Err(WasiError::Errno(Errno::Fault))));
    }
}
