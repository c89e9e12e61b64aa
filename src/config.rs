use std::env;
use std::path::PathBuf;

pub const WORKSPACE_VAR: &str = "ATTENDD_WORKSPACE";
pub const DEFAULT_LOG_FILTER: &str = "attendd=info";

/// Settings read once at startup. Everything else arrives over IPC.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Workspace opened before the first request, if set.
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            workspace: env::var_os(WORKSPACE_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}
