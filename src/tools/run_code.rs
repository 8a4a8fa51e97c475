//! Remote code execution tool

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use crate::common::prelude::*;
use crate::session::Session;
use crate::tools::{Tool, ToolDescriptor};

/// Runs a Python cell in the sandbox and reports its outputs
pub struct ExecutePython;

/// Present-and-non-empty accessor, matching the kernel's habit of sending
/// empty strings for unused channels
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[async_trait]
impl Tool for ExecutePython {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "execute_python",
            description: "Execute python code in a Jupyter notebook cell and \
                          returns any result, stdout, stderr, display_data, and error.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The python code to execute in a single cell."
                    }
                },
                "required": ["code"]
            }),
            direct: false,
        }
    }

    async fn execute(&self, args: &Value, session: &mut Session) -> String {
        let Some(code) = args.get("code").and_then(Value::as_str) else {
            return "No code provided to execute.".to_string();
        };

        let execution = match session.sandbox.run_code(code).await {
            Ok(execution) => execution,
            Err(e) => return format!("An error occurred: {e}"),
        };

        if let Some(error) = &execution.error {
            return format!(
                "There was an error during execution: {}: {}.\n{}",
                error.name, error.value, error.traceback
            );
        }

        let mut message = String::new();
        if let Some(text) = present(&execution.text) {
            message.push_str(&format!("Result:\n{text}\n"));
        }
        if let Some(stdout) = present(&execution.stdout) {
            message.push_str(&format!("Stdout:\n{stdout}\n"));
        }
        if let Some(stderr) = present(&execution.stderr) {
            message.push_str(&format!("Stderr:\n{stderr}\n"));
        }

        if let Some(png) = present(&execution.png) {
            match BASE64.decode(png) {
                Ok(bytes) => {
                    let chart_path = session.workspace.chart_path();
                    match std::fs::write(&chart_path, bytes) {
                        Ok(()) => info!("Saved chart to {:?}", chart_path),
                        Err(e) => warn!("Failed to save chart: {}", e),
                    }
                }
                Err(e) => warn!("Discarding undecodable chart payload: {}", e),
            }
        }

        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::sandbox::{Execution, ExecutionError, MockCodeSandbox};
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
    async fn test_execute_formats_output_sections() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox.expect_run_code().returning(|_| {
            Ok(Execution {
                text: Some("42".into()),
                stdout: Some("computing\n".into()),
                stderr: Some(String::new()),
                ..Execution::default()
            })
        });
        let mut session = session_with(sandbox, temp.path());

        let result = ExecutePython
            .execute(&json!({"code": "6 * 7"}), &mut session)
            .await;

        assert_eq!(result, "Result:\n42\nStdout:\ncomputing\n\n");
    }

    #[tokio::test]
    async fn test_execute_reports_kernel_error() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox.expect_run_code().returning(|_| {
            Ok(Execution {
                error: Some(ExecutionError {
                    name: "NameError".into(),
                    value: "name 'x' is not defined".into(),
                    traceback: "Traceback...".into(),
                }),
                ..Execution::default()
            })
        });
        let mut session = session_with(sandbox, temp.path());

        let result = ExecutePython
            .execute(&json!({"code": "x"}), &mut session)
            .await;

        assert_eq!(
            result,
            "There was an error during execution: NameError: name 'x' is not defined.\nTraceback..."
        );
    }

    #[tokio::test]
    async fn test_execute_saves_chart() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox.expect_run_code().returning(|_| {
            Ok(Execution {
                stdout: Some("plotted\n".into()),
                png: Some(BASE64.encode(b"fake png bytes")),
                ..Execution::default()
            })
        });
        let mut session = session_with(sandbox, temp.path());
        session.workspace.initialize().unwrap();

        let result = ExecutePython
            .execute(&json!({"code": "plt.show()"}), &mut session)
            .await;

        assert!(result.contains("plotted"));
        let saved = std::fs::read(session.workspace.chart_path()).unwrap();
        assert_eq!(saved, b"fake png bytes");
    }

    #[tokio::test]
    async fn test_execute_sandbox_fault_becomes_string() {
        let temp = tempdir().unwrap();
        let mut sandbox = MockCodeSandbox::new();
        sandbox
            .expect_run_code()
            .returning(|_| Err(Error::sandbox("service unavailable")));
        let mut session = session_with(sandbox, temp.path());

        let result = ExecutePython
            .execute(&json!({"code": "1"}), &mut session)
            .await;

        assert!(result.starts_with("An error occurred:"));
        assert!(result.contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_execute_missing_code_argument() {
        let temp = tempdir().unwrap();
        let sandbox = MockCodeSandbox::new();
        let mut session = session_with(sandbox, temp.path());

        let result = ExecutePython.execute(&json!({}), &mut session).await;
        assert_eq!(result, "No code provided to execute.");
    }
}
