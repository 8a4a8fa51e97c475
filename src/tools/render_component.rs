//! Component rendering tool
//!
//! Writes the model's component code to the page file, then drives one
//! build-then-serve watcher run and reports its outcome. On success the serve
//! handle is stored in the session so the preview stays live.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::prelude::*;
use crate::preview::{PreviewWatcher, ProcessCommand, WatcherConfig};
use crate::session::Session;
use crate::tools::{Tool, ToolDescriptor};

pub struct RenderComponent;

#[async_trait]
impl Tool for RenderComponent {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "render_react",
            description: "Render a react component with the given code and \
                          return the render result.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Code to render a react component. Should not contain localfile import statements."
                    }
                },
                "required": ["code"]
            }),
            direct: true,
        }
    }

    async fn execute(&self, args: &Value, session: &mut Session) -> String {
        let Some(code) = args.get("code").and_then(Value::as_str) else {
            return "No component code provided.".to_string();
        };

        match render(code, session).await {
            Ok(message) => message,
            Err(e) => format!("An error occurred: {e}"),
        }
    }
}

async fn render(code: &str, session: &mut Session) -> Result<String> {
    let page_path = session
        .workspace
        .page_path(&session.settings.preview.page_file);
    if let Some(parent) = page_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&page_path, code)?;
    info!("Wrote component to {:?}", page_path);

    // The previous preview still holds the listening port; stop it first.
    session.retire_preview().await;

    let preview = &session.settings.preview;
    let config = WatcherConfig::new(
        ProcessCommand::new(&session.npm_path).args(["run", "build"]),
        ProcessCommand::new(&session.npm_path).arg("start"),
        session.workspace.root(),
        session.workspace.marker_path(),
    )
    .with_poll_timeout(Duration::from_secs(preview.poll_timeout_secs))
    .with_startup_timeout(Duration::from_secs(preview.startup_timeout_secs))
    .with_patterns(&preview.success_pattern, &preview.error_pattern);

    let watcher = PreviewWatcher::new(config)?;
    let (outcome, serve) = watcher.run().await?;

    if outcome.is_success() {
        if let Some(handle) = serve {
            session.set_preview(handle);
        }
    }
    // Other outcomes drop the handle here and the serve child is reaped.

    Ok(outcome.user_message())
}
