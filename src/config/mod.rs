//! Configuration file parsing for Easel
//!
//! Supports:
//! - `.easel/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{easel_dir, init_config_dir, load_settings};
pub use types::*;
