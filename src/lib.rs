//! Easel Library
//!
//! A chat front-end for a tool-calling model: sandboxed Python execution,
//! npm package management, and live React component previews.

// Module declarations
pub mod agent;
pub mod chat;
pub mod common;
pub mod config;
pub mod core;
pub mod llm;
pub mod preview;
pub mod sandbox;
pub mod session;
pub mod tools;

// Re-export main entry points
pub use chat::{run, run_chat};
