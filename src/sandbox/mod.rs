//! Remote code execution: sandbox service client and result payloads

pub mod client;
pub mod types;

pub use client::{CodeSandbox, HttpSandbox, REMOTE_HOME};
#[cfg(test)]
pub use client::MockCodeSandbox;
pub use types::{Execution, ExecutionError};
