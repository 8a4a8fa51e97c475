//! Build and serve process management

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::common::prelude::*;
use crate::core::{LogLine, StreamSource};

/// A resolved external command: program path plus arguments
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Display string for logging
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Read lines from one child output stream and enqueue them as tagged log lines.
///
/// The sender is unbounded, so enqueueing never blocks the reader. The task
/// ends when the stream closes (process exit) or the receiver is dropped.
async fn stream_reader<R>(stream: R, source: StreamSource, tx: mpsc::UnboundedSender<LogLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream).lines();

    while let Ok(Some(line)) = reader.next_line().await {
        trace!("{}: {}", source.prefix(), line);

        if tx.send(LogLine::new(source, line)).is_err() {
            debug!("{} channel closed", source.prefix());
            break;
        }
    }

    debug!("{} reader finished", source.prefix());
}

fn spawn_child(command: &ProcessCommand, workdir: &Path) -> Result<Child> {
    info!("Spawning: {} (in {})", command.display(), workdir.display());

    Command::new(&command.program)
        .args(&command.args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true) // Critical: cleanup on drop
        .spawn()
        .map_err(|e| Error::ProcessSpawn {
            reason: format!("{}: {}", command.display(), e),
        })
}

/// Run the build command to completion.
///
/// Both output streams are drained into `line_tx` (tagged as build streams)
/// while the child runs, so the pipe buffers cannot fill and stall the build.
/// Lines stay queued for the serve-phase consumer.
pub async fn run_build(
    command: &ProcessCommand,
    workdir: &Path,
    line_tx: mpsc::UnboundedSender<LogLine>,
) -> Result<ExitStatus> {
    let mut child = spawn_child(command, workdir)?;

    let stdout = child.stdout.take().ok_or_else(|| {
        Error::process("build stdout was not captured")
    })?;
    tokio::spawn(stream_reader(
        stdout,
        StreamSource::BuildStdout,
        line_tx.clone(),
    ));

    let stderr = child.stderr.take().ok_or_else(|| {
        Error::process("build stderr was not captured")
    })?;
    tokio::spawn(stream_reader(stderr, StreamSource::BuildStderr, line_tx));

    let status = child
        .wait()
        .await
        .map_err(|e| Error::process(format!("failed waiting for build: {}", e)))?;

    info!("Build process exited with status: {:?}", status);
    Ok(status)
}

/// Manages the long-running serve child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background
/// task that calls `child.wait()`, so the real exit status is always reaped.
/// `ServeProcess` retains a kill channel to request termination, an atomic
/// flag for synchronous `has_exited()` checks, and a [`Notify`] handle so
/// `shutdown()` can await exit without polling.
pub struct ServeProcess {
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl ServeProcess {
    /// Spawn the serve command with both output streams draining into `line_tx`.
    pub fn spawn(
        command: &ProcessCommand,
        workdir: &Path,
        line_tx: mpsc::UnboundedSender<LogLine>,
    ) -> Result<Self> {
        let mut child = spawn_child(command, workdir)?;
        let pid = child.id();

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::process("serve stdout was not captured")
        })?;
        tokio::spawn(stream_reader(
            stdout,
            StreamSource::ServeStdout,
            line_tx.clone(),
        ));

        let stderr = child.stderr.take().ok_or_else(|| {
            Error::process("serve stderr was not captured")
        })?;
        tokio::spawn(stream_reader(stderr, StreamSource::ServeStderr, line_tx));

        // Shared exit-state primitives
        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());

        // Kill channel: ServeProcess holds the sender, wait task holds the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // Dedicated wait task takes ownership of `child`.
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Background task: owns `child` and waits for it to exit.
    ///
    /// Two ways the task can end:
    /// 1. The serve process exits naturally and `child.wait()` resolves.
    /// 2. `kill_rx` fires, in which case we kill the child and then wait for it.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        tokio::select! {
            // Natural exit path
            result = child.wait() => {
                match result {
                    Ok(status) => info!("Serve process exited with status: {:?}", status),
                    Err(e) => error!("Error waiting for serve process: {}", e),
                }
            }
            // Kill path: kill_tx was sent (by shutdown or drop)
            _ = kill_rx => {
                info!("Kill signal received, terminating serve process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill serve process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => info!("Serve process killed, exit status: {:?}", status),
                    Err(e) => error!("Error waiting after kill: {}", e),
                }
            }
        }

        // Mark the exit and wake any waiters, in that order, so has_exited()
        // is already true when a shutdown() waiter resumes.
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();
    }

    /// Terminate the serve process and wait for the OS to reap it.
    pub async fn shutdown(&mut self) -> Result<()> {
        use std::time::Duration;
        use tokio::time::timeout;

        // Fast path: already dead
        if self.has_exited() {
            debug!("Serve process already exited, nothing to shut down");
            return Ok(());
        }

        info!("Shutting down serve process (pid: {:?})", self.pid);

        // Race-free pattern: create the `notified()` future BEFORE signalling
        // and re-checking, so a notification between the check and the await
        // cannot be missed.
        let notified = self.exit_notify.notified();

        if let Some(tx) = self.kill_tx.take() {
            // Ignore send error: the wait task may have already finished.
            let _ = tx.send(());
        }

        if self.has_exited() {
            return Ok(());
        }

        match timeout(Duration::from_secs(2), notified).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!("Timed out waiting for serve process to exit");
                Err(Error::process("serve process did not exit after kill"))
            }
        }
    }

    /// Check if the process has already exited.
    ///
    /// Non-blocking, synchronous check backed by an atomic flag set by the
    /// wait task; takes `&self` and never races with `child.wait()`.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for ServeProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            debug!("ServeProcess dropped while running, sending kill signal");
            // The wait task tears down the child; kill_on_drop(true) on the
            // Child is the final safety net.
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessCommand {
        ProcessCommand::new("sh").arg("-c").arg(script)
    }

    async fn wait_until_exited(process: &ServeProcess) -> bool {
        for _ in 0..50 {
            if process.has_exited() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        false
    }

    #[test]
    fn test_process_command_display() {
        let cmd = ProcessCommand::new("npm").args(["run", "build"]);
        assert_eq!(cmd.display(), "npm run build");
    }

    #[tokio::test]
    async fn test_spawn_invalid_program() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cmd = ProcessCommand::new("/nonexistent/program-xyz");
        let result = ServeProcess::spawn(&cmd, &std::env::temp_dir(), tx);

        assert!(matches!(result, Err(Error::ProcessSpawn { .. })));
    }

    #[tokio::test]
    async fn test_build_captures_exit_status() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let status = run_build(&sh("exit 3"), &std::env::temp_dir(), tx)
            .await
            .unwrap();

        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_build_streams_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let status = run_build(
            &sh("echo building; echo oops >&2; exit 0"),
            &std::env::temp_dir(),
            tx,
        )
        .await
        .unwrap();
        assert!(status.success());

        let mut lines = Vec::new();
        while let Ok(Some(line)) =
            tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await
        {
            lines.push(line);
        }

        assert!(lines.contains(&LogLine::new(StreamSource::BuildStdout, "building")));
        assert!(lines.contains(&LogLine::new(StreamSource::BuildStderr, "oops")));
    }

    #[tokio::test]
    async fn test_serve_lines_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let process = ServeProcess::spawn(
            &sh("echo hello; echo err >&2; exit 0"),
            &std::env::temp_dir(),
            tx,
        )
        .unwrap();

        let mut lines = Vec::new();
        while let Ok(Some(line)) =
            tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await
        {
            lines.push(line);
        }

        assert!(lines.contains(&LogLine::new(StreamSource::ServeStdout, "hello")));
        assert!(lines.contains(&LogLine::new(StreamSource::ServeStderr, "err")));
        assert!(wait_until_exited(&process).await);
    }

    #[tokio::test]
    async fn test_has_exited_after_natural_exit() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let process = ServeProcess::spawn(&sh("exit 0"), &std::env::temp_dir(), tx).unwrap();

        assert!(wait_until_exited(&process).await);
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_kills_long_running_process() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut process =
            ServeProcess::spawn(&sh("sleep 60"), &std::env::temp_dir(), tx).unwrap();

        assert!(process.is_running());
        process.shutdown().await.expect("shutdown should not error");
        assert!(process.has_exited());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut process = ServeProcess::spawn(&sh("exit 0"), &std::env::temp_dir(), tx).unwrap();

        assert!(wait_until_exited(&process).await);
        process.shutdown().await.unwrap();
        process.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_closes_when_streams_finish() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _process = ServeProcess::spawn(&sh("echo one; exit 0"), &std::env::temp_dir(), tx)
            .unwrap();

        // Drain until the channel reports closed; spawn consumed the only
        // sender handles, so closure means both readers finished.
        let mut closed = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => continue,
            }
        }
        assert!(closed, "line channel should close after streams finish");
    }
}
