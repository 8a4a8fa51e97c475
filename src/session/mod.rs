//! Session context passed to every handler
//!
//! Holds the transcript, uploaded-file names, the pending image attachment,
//! and the live preview handle, with an explicit initialize/reset/teardown
//! lifecycle instead of implicit process-wide caching.

pub mod workspace;

pub use workspace::Workspace;

use std::path::PathBuf;
use std::sync::Arc;

use crate::common::prelude::*;
use crate::config::Settings;
use crate::llm::ChatMessage;
use crate::preview::ServeProcess;
use crate::sandbox::CodeSandbox;

/// Guidelines sent to the model at the start of every session
pub const SYSTEM_PROMPT: &str = "\
You are a Python and React expert. You can create React applications and run Python code in a Jupyter notebook. Here are some guidelines for this environment:
- The python code runs in jupyter notebook.
- Display visualizations using matplotlib or any other visualization library directly in the notebook. don't worry about saving the visualizations to a file.
- You have access to the internet and can make api requests.
- You also have access to the filesystem and can read/write files.
- You can install any pip package when you need. But the usual packages for data analysis are already preinstalled. Use the `!pip install -q package_name` command to install a package.
- You can run any python code you want, everything is running in a secure sandbox environment.
- NEVER execute provided tools when you are asked to explain your code.
- NEVER use `execute_python` tool when you are asked to create a react application. Use `render_react` tool instead.
- Prioritize to use tailwindcss for styling your react components.";

/// Resolve the npm binary, covering the `.cmd` shim on Windows
pub fn resolve_npm() -> Result<PathBuf> {
    which::which("npm")
        .or_else(|_| which::which("npm.cmd"))
        .map_err(|_| Error::NpmNotFound)
}

/// Mutable state for one chat session
pub struct Session {
    pub settings: Settings,
    pub workspace: Workspace,
    pub sandbox: Arc<dyn CodeSandbox>,
    /// Resolved npm binary used by the install and render tools
    pub npm_path: PathBuf,
    transcript: Vec<ChatMessage>,
    uploaded_files: Vec<String>,
    /// Base64 image attached to the next user message
    pending_image: Option<String>,
    /// Serve process of the current preview, if one is live
    preview: Option<ServeProcess>,
}

impl Session {
    pub fn new(
        settings: Settings,
        workspace: Workspace,
        sandbox: Arc<dyn CodeSandbox>,
        npm_path: PathBuf,
    ) -> Self {
        Self {
            settings,
            workspace,
            sandbox,
            npm_path,
            transcript: vec![ChatMessage::system(SYSTEM_PROMPT)],
            uploaded_files: Vec::new(),
            pending_image: None,
            preview: None,
        }
    }

    /// Prepare the workspace and restore the initial transcript
    pub async fn initialize(&mut self) -> Result<()> {
        self.retire_preview().await;
        self.workspace.initialize()?;
        self.transcript = vec![ChatMessage::system(SYSTEM_PROMPT)];
        self.uploaded_files.clear();
        self.pending_image = None;
        info!("Session initialized");
        Ok(())
    }

    /// Discard all conversation state and start over
    pub async fn reset(&mut self) -> Result<()> {
        self.initialize().await
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    /// Record an uploaded file and tell the model about it
    pub fn record_upload(&mut self, name: &str) {
        self.uploaded_files.push(name.to_string());
        if let Some(system) = self.transcript.first_mut() {
            system.append_text(&format!(
                "\n\nThese files are saved to disk. User may ask questions about them. {name}"
            ));
        }
    }

    pub fn uploaded_files(&self) -> &[String] {
        &self.uploaded_files
    }

    /// Attach an image to the next user message
    pub fn set_pending_image(&mut self, base64_data: String) {
        self.pending_image = Some(base64_data);
    }

    pub fn take_pending_image(&mut self) -> Option<String> {
        self.pending_image.take()
    }

    /// Keep the serve handle of a ready preview
    pub fn set_preview(&mut self, handle: ServeProcess) {
        self.preview = Some(handle);
    }

    pub fn preview_running(&self) -> bool {
        self.preview.as_ref().is_some_and(|p| p.is_running())
    }

    /// Stop the live preview process, if any
    pub async fn retire_preview(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            if let Err(e) = preview.shutdown().await {
                warn!("Failed to stop previous preview process: {}", e);
            }
        }
    }

    /// Tear the session down at exit
    pub async fn shutdown(&mut self) {
        self.retire_preview().await;
    }
}
