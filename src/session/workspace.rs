//! Workspace paths and artifact lifecycle

use std::path::{Path, PathBuf};

use crate::common::prelude::*;
use crate::config;

/// Sentinel file signaling that a preview is being served
const MARKER_FILENAME: &str = "preview.flag";
/// Chart image captured from code executions
const CHART_FILENAME: &str = "chart.png";
const DOWNLOADS_DIR: &str = "downloads";
const UPLOADS_DIR: &str = "uploads";

/// Well-known paths under one workspace root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.easel/` runtime directory
    pub fn easel_dir(&self) -> PathBuf {
        config::easel_dir(&self.root)
    }

    /// Marker whose existence signals a ready preview
    pub fn marker_path(&self) -> PathBuf {
        self.easel_dir().join(MARKER_FILENAME)
    }

    pub fn chart_path(&self) -> PathBuf {
        self.root.join(CHART_FILENAME)
    }

    /// Files fetched from the sandbox for the user land here
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    /// Local copies of files pushed to the sandbox
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Absolute path of the page file a rendered component is written to
    pub fn page_path(&self, page_file: &Path) -> PathBuf {
        self.root.join(page_file)
    }

    pub fn marker_exists(&self) -> bool {
        self.marker_path().exists()
    }

    pub fn chart_exists(&self) -> bool {
        self.chart_path().exists()
    }

    /// Files currently in `downloads/`, sorted by name
    pub fn list_downloads(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.downloads_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }

    /// Create runtime directories and clear artifacts left by a previous
    /// session: the marker, the chart, and the contents of `downloads/` and
    /// `uploads/`.
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(self.easel_dir())?;

        for file in [self.marker_path(), self.chart_path()] {
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
        }

        for dir in [self.downloads_dir(), self.uploads_dir()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;
        }

        debug!("Workspace initialized at {:?}", self.root);
        Ok(())
    }
}
