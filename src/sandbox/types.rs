//! Result payloads returned by the code sandbox

use serde::{Deserialize, Serialize};

/// Structured error raised inside the sandbox kernel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Exception class name
    pub name: String,
    /// Exception message
    pub value: String,
    #[serde(default)]
    pub traceback: String,
}

/// Captured outputs of one code execution
///
/// Every field is optional; the kernel omits what the cell did not produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Text representation of the last expression, if any
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub stdout: Option<String>,

    #[serde(default)]
    pub stderr: Option<String>,

    #[serde(default)]
    pub error: Option<ExecutionError>,

    /// Inline chart captured by the kernel, base64-encoded PNG
    #[serde(default)]
    pub png: Option<String>,
}
