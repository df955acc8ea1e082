//! Config path resolution

use std::path::{Path, PathBuf};

use super::ConfigResult;

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "BEMKIT_CONFIG_DIR";

fn default_config_dir(base: &Path) -> PathBuf {
    base.join(".bemkit")
}

/// Returns the config directory.
///
/// Uses `$BEMKIT_CONFIG_DIR` when set, otherwise `.bemkit/` under the
/// current directory.
pub fn config_dir() -> ConfigResult<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(default_config_dir(&std::env::current_dir()?)),
    }
}

/// Workspace config path inside `dir`
pub fn workspace_config_path_in(dir: &Path) -> PathBuf {
    dir.join("workspace.toml")
}

/// Returns the workspace config path.
///
/// Path: `{config_dir}/workspace.toml`
pub fn workspace_config_path() -> ConfigResult<PathBuf> {
    Ok(workspace_config_path_in(&config_dir()?))
}
