//! Core domain types - pure business logic with no external dependencies

pub mod types;

pub use types::*;
