//! File transfer tool: sandbox to user

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::prelude::*;
use crate::sandbox::REMOTE_HOME;
use crate::session::Session;
use crate::tools::{Tool, ToolDescriptor};

/// Downloads a sandbox file into the workspace `downloads/` directory
pub struct SendFile;

#[async_trait]
impl Tool for SendFile {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "send_file_to_user",
            description: "Send a single file to the user.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "The file path to send"
                    }
                },
                "required": ["filepath"]
            }),
            direct: true,
        }
    }

    async fn execute(&self, args: &Value, session: &mut Session) -> String {
        let Some(filepath) = args.get("filepath").and_then(Value::as_str) else {
            return "No filepath provided.".to_string();
        };

        let remote_path = format!("{REMOTE_HOME}{filepath}");
        let bytes = match session.sandbox.download_file(&remote_path).await {
            Ok(bytes) => bytes,
            Err(e) => return format!("An error occurred: {e}"),
        };

        match save_download(session, filepath, &bytes) {
            Ok(()) => "File sent to the user successfully.".to_string(),
            Err(e) => format!("An error occurred: {e}"),
        }
    }
}

fn save_download(session: &Session, filepath: &str, bytes: &[u8]) -> Result<()> {
    let target = session.workspace.downloads_dir().join(filepath);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, bytes)?;
    info!("Saved download to {:?}", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::sandbox::MockCodeSandbox;
    use crate::session::Workspace;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn session_with(sandbox: MockCodeSandbox, root: &std::path::Path) -> Session {
        Session::new(
            Settings::default(),
            Workspace::new(root),
            Arc::new(sandbox),
            PathBuf::from("/usr/bin/npm"),
        )
    }

    #[tokio::test]
    async fn test_send_file_saves_into_downloads() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox
            .expect_download_file()
            .withf(|path| path == "/home/user/report.csv")
            .returning(|_| Ok(b"a,b\n1,2\n".to_vec()));
        let mut session = session_with(sandbox, temp.path());
        session.workspace.initialize().unwrap();

        let result = SendFile
            .execute(&json!({"filepath": "report.csv"}), &mut session)
            .await;

        assert_eq!(result, "File sent to the user successfully.");
        let saved = std::fs::read(session.workspace.downloads_dir().join("report.csv")).unwrap();
        assert_eq!(saved, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_send_file_missing_remote_becomes_string() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox
            .expect_download_file()
            .returning(|path| Err(Error::sandbox(format!("Remote file not found: {path}"))));
        let mut session = session_with(sandbox, temp.path());

        let result = SendFile
            .execute(&json!({"filepath": "missing.csv"}), &mut session)
            .await;

        assert!(result.starts_with("An error occurred:"));
        assert!(result.contains("missing.csv"));
    }

    #[tokio::test]
    async fn test_send_file_missing_argument() {
        let temp = tempdir().unwrap();
        let sandbox = MockCodeSandbox::new();
        let mut session = session_with(sandbox, temp.path());

        let result = SendFile.execute(&json!({}), &mut session).await;
        assert_eq!(result, "No filepath provided.");
    }
}
