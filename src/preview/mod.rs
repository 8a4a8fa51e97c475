//! Component preview: build/serve orchestration and output classification

pub mod classify;
pub mod process;
pub mod watcher;

pub use classify::{LineClass, OutputClassifier};
pub use process::{ProcessCommand, ServeProcess};
pub use watcher::{PreviewWatcher, WatcherConfig};
