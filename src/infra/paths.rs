// src/infra/paths.rs — Config path management
//
// All paths respect the BANTER_HOME environment variable for isolation.
// When BANTER_HOME is set, config and persona files live under that directory.
// When unset, they live under ~/.banter/.

use std::path::PathBuf;

/// Returns the BANTER_HOME override, if set.
fn banter_home() -> Option<PathBuf> {
    std::env::var_os("BANTER_HOME").map(PathBuf::from)
}

/// Configuration directory: $BANTER_HOME/ or ~/.banter/
pub fn config_dir() -> PathBuf {
    if let Some(home) = banter_home() {
        return home;
    }
    dirs_home().join(".banter")
}

/// Home directory, or the current directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persona file path (user-level)
pub fn persona_path() -> PathBuf {
    config_dir().join("PERSONA.md")
}

/// Persona file path (project-level, relative to the working directory)
pub fn workspace_persona_path() -> PathBuf {
    PathBuf::from(".banter").join("PERSONA.md")
}
