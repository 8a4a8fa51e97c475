//! Chat front-end: surface trait, terminal renderer, and the stdin loop

pub mod runner;
pub mod surface;
pub mod terminal;

pub use runner::{run, run_chat};
pub use surface::ChatSurface;
pub use terminal::TerminalSurface;
