//! Settings parser for .easel/config.toml

use super::types::Settings;
use crate::common::prelude::*;
use fs2::FileExt;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const EASEL_DIR: &str = ".easel";

/// Path of the runtime directory inside a workspace
pub fn easel_dir(workspace: &Path) -> PathBuf {
    workspace.join(EASEL_DIR)
}

/// Load settings from .easel/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(workspace: &Path) -> Settings {
    let config_path = easel_dir(workspace).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create the default config file in .easel/
///
/// Existing files are left untouched. The write holds an exclusive file lock
/// so concurrent invocations cannot interleave partial content.
pub fn init_config_dir(workspace: &Path) -> Result<()> {
    let dir = easel_dir(workspace);

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::config(format!("Failed to create .easel dir: {}", e)))?;
    }

    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# Easel Configuration

[model]
api_base = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"   # Key is read from this environment variable
name = "gpt-4o-mini"
temperature = 0.0

[sandbox]
api_base = "http://localhost:8080"
api_key_env = "SANDBOX_API_KEY"

[preview]
page_file = "app/page.tsx"
port = 3000
poll_timeout_secs = 5            # Bounded wait per output line
startup_timeout_secs = 30        # Overall serve startup timeout
success_pattern = "Compiled successfully|webpack compiled successfully"
error_pattern = "Failed to compile|Error:|ERROR in"

[behavior]
max_tool_iterations = 8
"#;
        write_locked(&config_path, default_content)?;
    }

    Ok(())
}

/// Write a config file under an exclusive lock
fn write_locked(path: &Path, content: &str) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::config(format!("Failed to open {:?}: {}", path, e)))?;

    file.lock_exclusive()
        .map_err(|e| Error::config(format!("Failed to lock {:?}: {}", path, e)))?;

    use std::io::Write;
    let mut file = file;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write {:?}: {}", path, e)))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush {:?}: {}", path, e)))?;

    // Lock is released when the file is dropped
    Ok(())
}
