//! Easel - chat-driven Python execution and React component previews
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use easel::common::prelude::*;
use easel::config;
use easel::session::Workspace;

/// Easel - chat with a tool-calling model that runs Python in a sandbox
/// and serves live React component previews
#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(about = "Chat-driven Python execution and React component previews", long_about = None)]
struct Args {
    /// Path to the Next.js workspace
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Override the configured model name
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// Clear session artifacts (marker, chart, uploads, downloads) and exit
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Get workspace path from args or use current directory
    let base_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if !base_path.is_dir() {
        eprintln!("❌ No workspace found in: {}", base_path.display());
        eprintln!();
        eprintln!("Hint: Run easel from a Next.js project directory,");
        eprintln!("      or pass the project path as an argument:");
        eprintln!("      easel /path/to/nextjs/app");
        std::process::exit(1);
    }

    let workspace = dunce::canonicalize(&base_path)?;

    if !workspace.join("package.json").exists() {
        eprintln!("⚠️  No package.json in: {}", workspace.display());
        eprintln!("   Component previews need a Next.js project in the workspace.");
        eprintln!();
    }

    if args.reset {
        Workspace::new(&workspace).initialize()?;
        eprintln!("✅ Session artifacts cleared in: {}", workspace.display());
        return Ok(());
    }

    config::init_config_dir(&workspace)?;
    let mut settings = config::load_settings(&workspace);
    if let Some(model) = args.model {
        settings.model.name = model;
    }

    easel::run(settings, &workspace).await
}
