// Command and reactor entry points

use crate::wasi::context::{Context, WasiView};
use crate::wasi::error::{ContextError, ExitSignal};
use wasmtime::{Instance, Store};

/// Set the one-shot latch and bind the instance's `memory` export.
fn bind<T: WasiView + 'static>(
    store: &mut Store<T>,
    instance: &Instance,
) -> Result<(), ContextError> {
    let ctx = store.data_mut().ctx();
    if ctx.started {
        return Err(ContextError::AlreadyStarted);
    }
    ctx.started = true;

    let memory = instance.get_memory(&mut *store, "memory").ok_or(ContextError::MissingMemory)?;
    store.data_mut().ctx().memory = Some(memory);
    Ok(())
}

impl Context {
    /// Run a command module's `_start`.
    ///
    /// Returns `None` when `_start` returns normally and `Some(code)` when
    /// the guest called `proc_exit` without `exit_on_return`.
    pub fn start<T: WasiView + 'static>(
        store: &mut Store<T>,
        instance: &Instance,
    ) -> Result<Option<i32>, ContextError> {
        bind(store, instance)?;

        if instance.get_func(&mut *store, "_initialize").is_some() {
            return Err(ContextError::InitializeIsFunction);
        }
        let entry = instance
            .get_typed_func::<(), ()>(&mut *store, "_start")
            .map_err(|_| ContextError::StartNotFunction)?;

        tracing::debug!("running _start");
        match entry.call(&mut *store, ()) {
            Ok(()) => Ok(None),
            Err(err) => match err.downcast_ref::<ExitSignal>() {
                Some(exit) => Ok(Some(exit.code())),
                None => Err(ContextError::Trap(err)),
            },
        }
    }

    /// Initialize a reactor module, calling `_initialize` if it is exported.
    pub fn initialize<T: WasiView + 'static>(
        store: &mut Store<T>,
        instance: &Instance,
    ) -> Result<(), ContextError> {
        bind(store, instance)?;

        if instance.get_func(&mut *store, "_start").is_some() {
            return Err(ContextError::StartIsFunction);
        }
        let Some(export) = instance.get_export(&mut *store, "_initialize") else {
            return Ok(());
        };
        let init = export
            .into_func()
            .ok_or(ContextError::InitializeNotFunction)?
            .typed::<(), ()>(&*store)
            .map_err(|_| ContextError::InitializeNotFunction)?;

        tracing::debug!("running _initialize");
        init.call(&mut *store, ()).map_err(ContextError::Trap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHostFs;
    use crate::wasi::config::WasiConfig;
    use crate::wasi::linker::add_to_linker;
    use wasmtime::{Engine, Linker, Module};

    fn instantiate(wat: &str) -> (Store<Context>, Instance) {
        let engine = Engine::default();
        let module = Module::new(&engine, wat).unwrap();
        let mut linker = Linker::new(&engine);
        add_to_linker(&mut linker).unwrap();

        let config = WasiConfig::default().with_exit_on_return(false);
        let ctx = Context::new(config, Box::new(MockHostFs::new())).unwrap();
        let mut store = Store::new(&engine, ctx);
        let instance = linker.instantiate(&mut store, &module).unwrap();
        (store, instance)
    }

    #[test]
    fn test_start_runs_to_completion() {
        let (mut store, instance) =
            instantiate(r#"(module (memory (export "memory") 1) (func (export "_start")))"#);
        assert_eq!(Context::start(&mut store, &instance).unwrap(), None);
        assert!(store.data().is_started());
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut store, instance) =
            instantiate(r#"(module (memory (export "memory") 1) (func (export "_start")))"#);
        Context::start(&mut store, &instance).unwrap();
        assert!(matches!(
            Context::start(&mut store, &instance),
            Err(ContextError::AlreadyStarted)
        ));
        assert!(matches!(
            Context::initialize(&mut store, &instance),
            Err(ContextError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_start_requires_memory() {
        let (mut store, instance) = instantiate(r#"(module (func (export "_start")))"#);
        assert!(matches!(Context::start(&mut store, &instance), Err(ContextError::MissingMemory)));
    }

    #[test]
    fn test_start_rejects_initialize_export() {
        let (mut store, instance) = instantiate(
            r#"(module
                (memory (export "memory") 1)
                (func (export "_start"))
                (func (export "_initialize")))"#,
        );
        assert!(matches!(
            Context::start(&mut store, &instance),
            Err(ContextError::InitializeIsFunction)
        ));
    }

    #[test]
    fn test_start_requires_start_function() {
        let (mut store, instance) = instantiate(r#"(module (memory (export "memory") 1))"#);
        assert!(matches!(
            Context::start(&mut store, &instance),
            Err(ContextError::StartNotFunction)
        ));
    }

    #[test]
    fn test_start_returns_exit_code() {
        let (mut store, instance) = instantiate(
            r#"(module
                (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
                (memory (export "memory") 1)
                (func (export "_start") (call $exit (i32.const 42)) unreachable))"#,
        );
        assert_eq!(Context::start(&mut store, &instance).unwrap(), Some(42));
    }

    #[test]
    fn test_start_propagates_trap() {
        let (mut store, instance) = instantiate(
            r#"(module (memory (export "memory") 1) (func (export "_start") unreachable))"#,
        );
        assert!(matches!(Context::start(&mut store, &instance), Err(ContextError::Trap(_))));
    }

    #[test]
    fn test_initialize_reactor() {
        let (mut store, instance) = instantiate(
            r#"(module
                (memory (export "memory") 1)
                (global $ready (mut i32) (i32.const 0))
                (func (export "_initialize") (global.set $ready (i32.const 1)))
                (func (export "ready") (result i32) (global.get $ready)))"#,
        );
        Context::initialize(&mut store, &instance).unwrap();

        let ready = instance.get_typed_func::<(), i32>(&mut store, "ready").unwrap();
        assert_eq!(ready.call(&mut store, ()).unwrap(), 1);
    }

    #[test]
    fn test_initialize_without_export() {
        let (mut store, instance) = instantiate(r#"(module (memory (export "memory") 1))"#);
        assert!(Context::initialize(&mut store, &instance).is_ok());
    }

    #[test]
    fn test_initialize_rejects_start_export() {
        let (mut store, instance) =
            instantiate(r#"(module (memory (export "memory") 1) (func (export "_start")))"#);
        assert!(matches!(
            Context::initialize(&mut store, &instance),
            Err(ContextError::StartIsFunction)
        ));
    }

    #[test]
    fn test_initialize_rejects_non_function_export() {
        let (mut store, instance) = instantiate(
            r#"(module
                (memory (export "memory") 1)
                (global (export "_initialize") i32 (i32.const 0)))"#,
        );
        assert!(matches!(
            Context::initialize(&mut store, &instance),
            Err(ContextError::InitializeNotFunction)
        ));
    }
}
