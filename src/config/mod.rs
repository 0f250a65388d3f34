use crate::wasi::WasiConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runner configuration: logging plus the WASI context options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub wasi: WasiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "wasibox=info".to_string(), json: false }
    }
}

impl Config {
    /// Load from an optional `wasibox.*` file in the working directory, an
    /// explicit file, then `WASIBOX__*` environment variables.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("wasibox").required(false));
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("WASIBOX").separator("__").try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
