//! Build-and-serve orchestration for the component preview
//!
//! Runs the build command to completion, then launches the long-running serve
//! command, draining both processes' output streams into one shared queue and
//! classifying lines until exactly one terminal outcome is reached.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::common::prelude::*;
use crate::core::{LogLine, WatchOutcome};
use crate::preview::classify::{
    LineClass, OutputClassifier, DEFAULT_ERROR_PATTERN, DEFAULT_SUCCESS_PATTERN,
};
use crate::preview::process::{run_build, ProcessCommand, ServeProcess};

/// Default bounded wait per queue pop
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default overall serve-phase startup timeout
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one watcher run
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Build command, run to completion first
    pub build: ProcessCommand,
    /// Serve command, long-running
    pub serve: ProcessCommand,
    /// Working directory for both commands
    pub workdir: PathBuf,
    /// Marker file written on success
    pub marker_path: PathBuf,
    /// Bounded wait per queue pop
    pub poll_timeout: Duration,
    /// Overall timeout measured from the start of the serve phase
    pub startup_timeout: Duration,
    /// Success regex source
    pub success_pattern: String,
    /// Error regex source
    pub error_pattern: String,
}

impl WatcherConfig {
    pub fn new(
        build: ProcessCommand,
        serve: ProcessCommand,
        workdir: impl Into<PathBuf>,
        marker_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            build,
            serve,
            workdir: workdir.into(),
            marker_path: marker_path.into(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            success_pattern: DEFAULT_SUCCESS_PATTERN.to_string(),
            error_pattern: DEFAULT_ERROR_PATTERN.to_string(),
        }
    }

    /// Set the bounded wait per queue pop
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the overall serve-phase startup timeout
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Set the success/error pattern pair
    pub fn with_patterns(
        mut self,
        success_pattern: impl Into<String>,
        error_pattern: impl Into<String>,
    ) -> Self {
        self.success_pattern = success_pattern.into();
        self.error_pattern = error_pattern.into();
        self
    }
}

/// Orchestrates one build-then-serve run and classifies its output.
///
/// One invocation produces exactly one [`WatchOutcome`]. The serve process is
/// returned alongside the outcome so the caller can keep it alive (the
/// preview stays served) or drop it (the child is killed).
pub struct PreviewWatcher {
    config: WatcherConfig,
    classifier: OutputClassifier,
}

impl PreviewWatcher {
    /// Build a watcher, compiling the configured pattern pair.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        let classifier = OutputClassifier::new(&config.success_pattern, &config.error_pattern)?;
        Ok(Self { config, classifier })
    }

    /// Run the build phase, then the serve phase, to a single outcome.
    ///
    /// The serve handle is `None` only when the build failed (the serve
    /// process was never created). Errors are reserved for launch faults and
    /// marker IO; every classification result is an `Ok` outcome.
    pub async fn run(&self) -> Result<(WatchOutcome, Option<ServeProcess>)> {
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<LogLine>();

        // Phase 1: build to completion. Its output lines stay queued and are
        // classified by the serve-phase loop below.
        let status = run_build(&self.config.build, &self.config.workdir, line_tx.clone()).await?;
        if !status.success() {
            warn!("Build failed with status {:?}", status.code());
            return Ok((WatchOutcome::BuildFailed { code: status.code() }, None));
        }

        // Phase 2: serve. The startup timeout measures from here. Moving
        // `line_tx` into the spawn leaves the two serve readers as the only
        // senders, so channel closure means both streams have finished.
        let started = Instant::now();
        let serve = ServeProcess::spawn(&self.config.serve, &self.config.workdir, line_tx)?;

        let outcome = self.serve_loop(&mut line_rx, started).await;
        if outcome.is_success() {
            write_marker(&self.config.marker_path)?;
        }

        Ok((outcome, Some(serve)))
    }

    /// Drain the shared queue until a terminal outcome is reached.
    async fn serve_loop(
        &self,
        line_rx: &mut mpsc::UnboundedReceiver<LogLine>,
        started: Instant,
    ) -> WatchOutcome {
        let mut errors: Vec<String> = Vec::new();
        let mut failed = false;

        loop {
            match timeout(self.config.poll_timeout, line_rx.recv()).await {
                Ok(Some(line)) => {
                    debug!("{}", line.display_line());

                    match self.classifier.classify(&line.text) {
                        LineClass::Success => {
                            info!("Success pattern matched: {}", line.text);
                            return WatchOutcome::Success;
                        }
                        LineClass::Error => {
                            warn!("Error line recorded: {}", line.text);
                            failed = true;
                            errors.push(line.text.clone());
                        }
                        LineClass::Neutral => {}
                    }

                    // The summary line ends a failed compile: everything the
                    // bundler had to say about the errors has arrived.
                    if failed && self.classifier.is_compile_summary(&line.text) {
                        info!("Compile summary seen after {} error line(s)", errors.len());
                        return WatchOutcome::CompileFailed { errors };
                    }
                }
                Ok(None) => {
                    debug!("Both stream readers finished");
                    break;
                }
                Err(_) => {
                    if started.elapsed() > self.config.startup_timeout {
                        warn!(
                            "No decisive output within {:?} of serve start",
                            self.config.startup_timeout
                        );
                        return WatchOutcome::TimedOut {
                            after_secs: self.config.startup_timeout.as_secs(),
                        };
                    }
                }
            }
        }

        // Streams closed without a decisive signal.
        if errors.is_empty() {
            warn!("Serve output ended without a success or error signal; treating as success");
            WatchOutcome::ResidualSuccess
        } else {
            WatchOutcome::ResidualFailure { errors }
        }
    }
}

/// Write the preview marker file.
///
/// Overwrites any previous marker; the file's existence, not its content, is
/// what signals preview availability.
fn write_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"flag")?;
    info!("Preview marker written: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> ProcessCommand {
        ProcessCommand::new("sh").arg("-c").arg(script)
    }

    fn quick(config: WatcherConfig) -> WatcherConfig {
        config
            .with_poll_timeout(Duration::from_millis(200))
            .with_startup_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_build_failure_skips_serve() {
        let temp = tempdir().unwrap();
        let sentinel = temp.path().join("serve-ran");
        let config = quick(WatcherConfig::new(
            sh("exit 1"),
            sh(&format!("touch {}", sentinel.display())),
            temp.path(),
            temp.path().join("preview.flag"),
        ));

        let watcher = PreviewWatcher::new(config).unwrap();
        let (outcome, serve) = watcher.run().await.unwrap();

        assert_eq!(outcome, WatchOutcome::BuildFailed { code: Some(1) });
        assert!(serve.is_none());
        assert!(!sentinel.exists(), "serve command must never run");
    }

    #[tokio::test]
    async fn test_success_line_writes_marker() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("preview.flag");
        let config = quick(WatcherConfig::new(
            sh("exit 0"),
            sh("echo 'webpack compiled successfully'; sleep 10"),
            temp.path(),
            &marker,
        ));

        let watcher = PreviewWatcher::new(config).unwrap();
        let (outcome, serve) = watcher.run().await.unwrap();

        assert_eq!(outcome, WatchOutcome::Success);
        assert!(marker.exists());
        let serve = serve.expect("serve handle should be returned");
        assert!(serve.is_running(), "serve process keeps running on success");
    }

    #[tokio::test]
    async fn test_invalid_config_pattern_fails_construction() {
        let temp = tempdir().unwrap();
        let config = WatcherConfig::new(
            sh("exit 0"),
            sh("exit 0"),
            temp.path(),
            temp.path().join("preview.flag"),
        )
        .with_patterns("[unclosed", DEFAULT_ERROR_PATTERN);

        assert!(matches!(
            PreviewWatcher::new(config),
            Err(Error::Pattern { .. })
        ));
    }
}
