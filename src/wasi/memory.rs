// Guest linear memory view

use crate::wasi::error::WasiResult;
use crate::wasi::types::{Errno, IOVEC_SIZE};
use std::ops::Range;

/// One scatter/gather segment described by the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoVec {
    pub buf: u32,
    pub len: u32,
}

/// Bounds-checked little-endian access to the guest's linear memory.
///
/// Every accessor fails with `EFAULT` when the requested range does not lie
/// inside the memory.
pub struct GuestMemory<'a> {
    bytes: &'a mut [u8],
}

impl<'a> GuestMemory<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn range(&self, ptr: u32, len: usize) -> WasiResult<Range<usize>> {
        let start = ptr as usize;
        let end = start.checked_add(len).ok_or(Errno::Fault)?;
        if end > self.bytes.len() {
            return Err(Errno::Fault.into());
        }
        Ok(start..end)
    }

    pub fn slice(&self, ptr: u32, len: u32) -> WasiResult<&[u8]> {
        let range = self.range(ptr, len as usize)?;
        Ok(&self.bytes[range])
    }

    pub fn slice_mut(&mut self, ptr: u32, len: u32) -> WasiResult<&mut [u8]> {
        let range = self.range(ptr, len as usize)?;
        Ok(&mut self.bytes[range])
    }

    pub fn write_bytes(&mut self, ptr: u32, data: &[u8]) -> WasiResult<()> {
        let range = self.range(ptr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    pub fn read_u32(&self, ptr: u32) -> WasiResult<u32> {
        let range = self.range(ptr, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[range]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_u64(&self, ptr: u32) -> WasiResult<u64> {
        let range = self.range(ptr, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[range]);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn write_u8(&mut self, ptr: u32, value: u8) -> WasiResult<()> {
        self.write_bytes(ptr, &[value])
    }

    pub fn write_u16(&mut self, ptr: u32, value: u16) -> WasiResult<()> {
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, ptr: u32, value: u32) -> WasiResult<()> {
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, ptr: u32, value: u64) -> WasiResult<()> {
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    /// Decode a UTF-8 string; invalid sequences are `EILSEQ`.
    pub fn read_string(&self, ptr: u32, len: u32) -> WasiResult<String> {
        let bytes = self.slice(ptr, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Errno::IlSeq.into())
    }

    /// Decode `count` consecutive {buf: u32, len: u32} records at `ptr`.
    pub fn iovecs(&self, ptr: u32, count: u32) -> WasiResult<Vec<IoVec>> {
        let total = (count as usize).checked_mul(IOVEC_SIZE as usize).ok_or(Errno::Fault)?;
        self.range(ptr, total)?;

        let mut iovecs = Vec::with_capacity(count as usize);
        for i in 0..count {
            let offset = ptr + i * IOVEC_SIZE;
            iovecs.push(IoVec { buf: self.read_u32(offset)?, len: self.read_u32(offset + 4)? });
        }
        Ok(iovecs)
    }
}
