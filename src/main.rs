use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wasibox::config::{Config, LogConfig};
use wasibox::wasi::{Context, ExitSignal, add_to_linker};
use wasmtime::{Engine, Linker, Module, Store};

/// Run a WebAssembly module against a sandboxed WASI snapshot_preview1 host.
#[derive(Parser, Debug)]
#[command(name = "wasibox", version)]
struct Cli {
    /// Configuration file, layered over `wasibox.*` in the working directory
    #[arg(long, env = "WASIBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Preopen a host directory: VIRTUAL=REAL, or REAL to expose it under the same name
    #[arg(long = "dir", value_name = "VIRTUAL=REAL")]
    dirs: Vec<String>,

    /// Guest environment variable
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    envs: Vec<(String, String)>,

    /// Treat the module as a reactor: run `_initialize` instead of `_start`
    #[arg(long)]
    reactor: bool,

    /// Export to call after a reactor has been initialized
    #[arg(long, requires = "reactor")]
    invoke: Option<String>,

    /// WebAssembly module to run
    module: PathBuf,

    /// Arguments passed to the guest after its program name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

fn parse_dir(s: &str) -> (String, PathBuf) {
    match s.split_once('=') {
        Some((virtual_path, real)) => (virtual_path.to_string(), PathBuf::from(real)),
        None => (s.to_string(), PathBuf::from(s)),
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log);

    let mut wasi = config.wasi;
    wasi.args = std::iter::once(cli.module.display().to_string()).chain(cli.args).collect();
    wasi.env.extend(cli.envs);
    wasi.preopens.extend(cli.dirs.iter().map(|dir| parse_dir(dir)));
    // proc_exit unwinds to start; the runner exits with the guest's code
    wasi.exit_on_return = false;

    tracing::info!(
        module = %cli.module.display(),
        preopens = wasi.preopens.len(),
        "starting guest"
    );

    let engine = Engine::default();
    let module = Module::from_file(&engine, &cli.module)
        .with_context(|| format!("failed to load module {}", cli.module.display()))?;
    let mut linker = Linker::new(&engine);
    add_to_linker(&mut linker)?;

    let ctx = Context::with_os_host(wasi)?;
    let mut store = Store::new(&engine, ctx);
    let instance = linker.instantiate(&mut store, &module)?;

    if !cli.reactor {
        if let Some(code) = Context::start(&mut store, &instance)? {
            tracing::info!(code, "guest exited");
            std::process::exit(code);
        }
        return Ok(());
    }

    Context::initialize(&mut store, &instance)?;
    if let Some(name) = cli.invoke {
        let func = instance.get_typed_func::<(), ()>(&mut store, &name)?;
        if let Err(err) = func.call(&mut store, ()) {
            if let Some(exit) = err.downcast_ref::<ExitSignal>() {
                std::process::exit(exit.code());
            }
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("A=1").unwrap(), ("A".to_string(), "1".to_string()));
        assert_eq!(parse_key_value("A=b=c").unwrap(), ("A".to_string(), "b=c".to_string()));
        assert_eq!(parse_key_value("EMPTY=").unwrap(), ("EMPTY".to_string(), String::new()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_dir() {
        assert_eq!(parse_dir("/sandbox=/tmp/s"), ("/sandbox".to_string(), PathBuf::from("/tmp/s")));
        assert_eq!(parse_dir("data"), ("data".to_string(), PathBuf::from("data")));
    }

    #[test]
    fn test_cli_parses_guest_args() {
        let cli = Cli::try_parse_from([
            "wasibox",
            "--dir",
            "/sandbox=/tmp/s",
            "--env",
            "K=V",
            "app.wasm",
            "--flag",
            "x",
        ])
        .unwrap();

        assert_eq!(cli.module, PathBuf::from("app.wasm"));
        assert_eq!(cli.args, vec!["--flag".to_string(), "x".to_string()]);
        assert_eq!(cli.dirs, vec!["/sandbox=/tmp/s".to_string()]);
        assert_eq!(cli.envs, vec![("K".to_string(), "V".to_string())]);
        assert!(!cli.reactor);
    }

    #[test]
    fn test_cli_invoke_requires_reactor() {
        assert!(Cli::try_parse_from(["wasibox", "--invoke", "run", "app.wasm"]).is_err());
        let args = ["wasibox", "--reactor", "--invoke", "run", "app.wasm"];
        assert!(Cli::try_parse_from(args).is_ok());
    }
}
