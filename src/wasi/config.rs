// WASI context configuration

use crate::host::Rid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Construction options for a WASI `Context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasiConfig {
    /// Command line passed to the guest; the first entry is the program path
    pub args: Vec<String>,

    /// Environment variables visible to the guest
    pub env: BTreeMap<String, String>,

    /// Whether `proc_exit` terminates the host process or returns to `start`
    pub exit_on_return: bool,

    /// Guest-visible virtual path mapped to a real host directory
    pub preopens: BTreeMap<String, PathBuf>,

    /// Host resource used as descriptor 0
    pub stdin: Option<Rid>,

    /// Host resource used as descriptor 1
    pub stdout: Option<Rid>,

    /// Host resource used as descriptor 2
    pub stderr: Option<Rid>,
}

impl Default for WasiConfig {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            env: BTreeMap::new(),
            exit_on_return: true,
            preopens: BTreeMap::new(),
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }
}

impl WasiConfig {
    /// Set the guest command line
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expose a host directory under a guest-visible path
    pub fn with_preopen(
        mut self,
        virtual_path: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.preopens.insert(virtual_path.into(), path.into());
        self
    }

    /// Choose whether `proc_exit` ends the host process
    pub fn with_exit_on_return(mut self, exit_on_return: bool) -> Self {
        self.exit_on_return = exit_on_return;
        self
    }

    pub fn with_stdin(mut self, rid: Rid) -> Self {
        self.stdin = Some(rid);
        self
    }

    pub fn with_stdout(mut self, rid: Rid) -> Self {
        self.stdout = Some(rid);
        self
    }

    pub fn with_stderr(mut self, rid: Rid) -> Self {
        self.stderr = Some(rid);
        self
    }
}
