//! Interactive chat loop
//!
//! Reads user lines from stdin, drives the agent loop for each message, and
//! surfaces post-turn artifacts: the live preview URL, charts, and downloaded
//! files. Slash commands handle uploads and session lifecycle.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use url::Url;

use crate::agent::AgentLoop;
use crate::chat::surface::ChatSurface;
use crate::chat::terminal::TerminalSurface;
use crate::common::prelude::*;
use crate::config::Settings;
use crate::llm::{ChatMessage, ChatModel, OpenAiChatModel};
use crate::sandbox::{CodeSandbox, HttpSandbox};
use crate::session::{resolve_npm, Session, Workspace};
use crate::tools::ToolRegistry;

/// Chat application entry point
///
/// Installs error reporting and logging, then runs the interactive loop
/// until stdin closes or the user quits.
pub async fn run(settings: Settings, workspace_root: &Path) -> Result<()> {
    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;
    crate::common::logging::init()?;

    info!("Workspace: {}", workspace_root.display());
    info!("Model: {}", settings.model.name);

    let result = run_chat(settings, workspace_root).await;

    if let Err(ref e) = result {
        error!("Application error: {:?}", e);
    }

    info!("Easel exiting");
    result
}

/// Run the interactive chat against stdin/stdout
pub async fn run_chat(settings: Settings, workspace_root: &Path) -> Result<()> {
    let npm_path = resolve_npm()?;
    let model = OpenAiChatModel::from_settings(&settings.model);
    let sandbox: Arc<dyn CodeSandbox> = Arc::new(HttpSandbox::from_settings(&settings.sandbox));
    let registry = ToolRegistry::builtin();

    let mut session = Session::new(settings, Workspace::new(workspace_root), sandbox, npm_path);
    session.initialize().await?;

    let mut surface = TerminalSurface::stdout();
    surface.notice("Easel ready. Type a message, or /upload <path>, /reset, /quit.")?;

    let input = BufReader::new(tokio::io::stdin());
    let result = chat_loop(&model, &registry, &mut session, &mut surface, input).await;

    session.shutdown().await;
    info!("Chat session ended");
    result
}

/// The line loop, generic over input and surface for tests
pub(crate) async fn chat_loop<R, S>(
    model: &dyn ChatModel,
    registry: &ToolRegistry,
    session: &mut Session,
    surface: &mut S,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: ChatSurface,
{
    let agent = AgentLoop::new(model, registry, session.settings.behavior.max_tool_iterations);
    let mut notices = NoticeState::default();
    let mut lines = input.lines();

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(command) = trimmed.strip_prefix('/') {
            let (name, rest) = command
                .split_once(' ')
                .map(|(n, r)| (n, r.trim()))
                .unwrap_or((command, ""));
            match name {
                "quit" | "q" => {
                    info!("Quit requested");
                    break;
                }
                "reset" => {
                    session.reset().await?;
                    notices = NoticeState::default();
                    surface.notice("Session reset.")?;
                }
                "upload" if !rest.is_empty() => handle_upload(rest, session, surface).await?,
                "upload" => surface.notice("Usage: /upload <path>")?,
                _ => surface.notice(&format!("Unknown command: /{name}"))?,
            }
            continue;
        }

        let message = match session.take_pending_image() {
            Some(image) => ChatMessage::user_with_image(
                trimmed,
                format!("data:image/jpeg;base64,{image}"),
            ),
            None => ChatMessage::user(trimmed),
        };
        session.push_message(message);

        if let Err(e) = agent.run_turn(session, surface).await {
            error!("Turn failed: {}", e);
            surface.notice(&format!("An error occurred: {e}"))?;
        }

        post_turn_notices(session, surface, &mut notices)?;
    }

    Ok(())
}

fn prompt() -> Result<()> {
    use std::io::Write;
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Copy the file into `uploads/`, push it to the sandbox, and remember it.
/// Image uploads additionally attach to the next user message.
async fn handle_upload(
    path_arg: &str,
    session: &mut Session,
    surface: &mut dyn ChatSurface,
) -> Result<()> {
    let source = Path::new(path_arg);
    let Some(name) = source.file_name().and_then(|n| n.to_str()) else {
        return surface.notice(&format!("Not a file path: {path_arg}"));
    };

    let bytes = match std::fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) => return surface.notice(&format!("Cannot read {path_arg}: {e}")),
    };

    let local = session.workspace.uploads_dir().join(name);
    if let Err(e) = std::fs::write(&local, &bytes) {
        warn!("Failed to keep local copy of upload: {}", e);
    }

    let image_data = is_image(name).then(|| BASE64.encode(&bytes));

    match session.sandbox.upload_file(name, bytes).await {
        Ok(remote_path) => {
            info!("Uploaded file to {}", remote_path);
            session.record_upload(name);
            if let Some(data) = image_data {
                session.set_pending_image(data);
            }
            surface.notice(&format!("Uploaded {name}"))
        }
        Err(e) => surface.notice(&format!("Upload failed: {e}")),
    }
}

fn is_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// What has already been announced, so artifacts are surfaced once
#[derive(Default)]
struct NoticeState {
    downloads: HashSet<PathBuf>,
    chart_mtime: Option<SystemTime>,
    marker_mtime: Option<SystemTime>,
}

fn post_turn_notices(
    session: &Session,
    surface: &mut dyn ChatSurface,
    state: &mut NoticeState,
) -> Result<()> {
    // The marker is rewritten by every successful render, so a changed mtime
    // means a fresh preview.
    let marker_mtime = modified(&session.workspace.marker_path());
    if marker_mtime.is_some() && marker_mtime != state.marker_mtime && session.preview_running() {
        state.marker_mtime = marker_mtime;
        surface.preview_ready(&preview_url(session.settings.preview.port))?;
    }

    let chart_path = session.workspace.chart_path();
    let chart_mtime = modified(&chart_path);
    if chart_mtime.is_some() && chart_mtime != state.chart_mtime {
        state.chart_mtime = chart_mtime;
        surface.image_ready(&chart_path)?;
    }

    for file in session.workspace.list_downloads() {
        if state.downloads.insert(file.clone()) {
            surface.file_ready(&file)?;
        }
    }

    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Cache-busting preview address
fn preview_url(port: u16) -> Url {
    let ts = chrono::Utc::now().timestamp();
    // Statically well-formed for any port and timestamp
    Url::parse(&format!("http://localhost:{port}/?t={ts}")).expect("preview URL is valid")
}
