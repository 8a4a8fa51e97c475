//! Model/tool dispatch loop

pub mod runner;

pub use runner::AgentLoop;
