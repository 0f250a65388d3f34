// Wasibox - sandboxed WASI snapshot_preview1 host
//
// `wasi` implements the syscall layer on top of wasmtime, `host` supplies the
// filesystem and clock operations it forwards to, and `config` loads runner
// settings.

pub mod config;
pub mod host;
pub mod wasi;
