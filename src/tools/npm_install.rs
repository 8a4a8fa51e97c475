//! npm dependency installation tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::common::prelude::*;
use crate::session::Session;
use crate::tools::{Tool, ToolDescriptor};

/// Installs npm packages into the workspace
pub struct NpmInstall;

#[async_trait]
impl Tool for NpmInstall {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "install_npm_dependencies",
            description: "Installs the given npm dependencies and returns the \
                          result of the installation.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "package_names": {
                        "type": "string",
                        "description": "Name of the npm packages to install. Should be space-separated."
                    }
                },
                "required": ["package_names"]
            }),
            direct: true,
        }
    }

    async fn execute(&self, args: &Value, session: &mut Session) -> String {
        let Some(package_names) = args.get("package_names").and_then(Value::as_str) else {
            return "No package names provided.".to_string();
        };

        let packages: Vec<&str> = package_names.split_whitespace().collect();
        if packages.is_empty() {
            return "No package names provided.".to_string();
        }

        info!("Installing npm packages: {:?}", packages);
        let output = Command::new(&session.npm_path)
            .arg("install")
            .args(&packages)
            .current_dir(session.workspace.root())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                debug!(
                    "npm install output: {}",
                    String::from_utf8_lossy(&output.stdout)
                );
                format!("Successfully installed npm packages '{package_names}'")
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("npm install failed: {}", stderr);
                format!("Failed to install npm packages '{package_names}': {stderr}")
            }
            Err(e) => format!("An error occurred: {e}"),
        }
    }
}
