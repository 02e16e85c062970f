// src/infra/paths.rs — Config and data path resolution
//
// All paths respect the AGENTLAB_HOME environment variable for isolation.
// When AGENTLAB_HOME is set, config lives directly under that directory.
// When unset, config uses ~/.agentlab/.

use std::path::PathBuf;

/// Returns the AGENTLAB_HOME override, if set.
fn agentlab_home() -> Option<PathBuf> {
    std::env::var_os("AGENTLAB_HOME").map(PathBuf::from)
}

/// Home directory, if the platform can determine one.
pub fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf())
}

/// Configuration directory: $AGENTLAB_HOME/ or ~/.agentlab/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = agentlab_home() {
        return Some(home);
    }
    dirs_home().map(|h| h.join(".agentlab"))
}

/// Config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Directory scanned for user pipeline definitions (`*.toml`).
pub fn pipelines_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("pipelines"))
}
