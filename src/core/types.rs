//! Core domain type definitions

/// Origin of a captured process output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// Build process stdout
    BuildStdout,
    /// Build process stderr
    BuildStderr,
    /// Serve process stdout
    ServeStdout,
    /// Serve process stderr
    ServeStderr,
}

impl StreamSource {
    /// Get display prefix for the stream
    pub fn prefix(&self) -> &'static str {
        match self {
            StreamSource::BuildStdout => "build stdout",
            StreamSource::BuildStderr => "build stderr",
            StreamSource::ServeStdout => "serve stdout",
            StreamSource::ServeStderr => "serve stderr",
        }
    }

    /// Check if this stream belongs to the build phase
    pub fn is_build(&self) -> bool {
        matches!(self, StreamSource::BuildStdout | StreamSource::BuildStderr)
    }

    /// Check if this stream belongs to the serve phase
    pub fn is_serve(&self) -> bool {
        !self.is_build()
    }
}

/// One tagged line of captured process output
///
/// Created by a stream reader, consumed once by the watcher loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub source: StreamSource,
    pub text: String,
}

impl LogLine {
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    /// Format for single-line display
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.source.prefix(), self.text)
    }
}

/// Terminal classification of one watcher run
///
/// Exactly one outcome is produced per invocation. `ResidualSuccess` is kept
/// distinct from `Success` so callers can tell a matched success line apart
/// from an ambiguous stream-closed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Build process exited non-zero; the serve phase was never attempted
    BuildFailed { code: Option<i32> },
    /// A line matched the success pattern; the serve process keeps running
    Success,
    /// Error lines were recorded and the compile summary marker arrived
    CompileFailed { errors: Vec<String> },
    /// No line arrived within the startup timeout
    TimedOut { after_secs: u64 },
    /// Both streams closed without a definitive signal and no errors recorded
    ResidualSuccess,
    /// Both streams closed with error lines recorded
    ResidualFailure { errors: Vec<String> },
}

impl WatchOutcome {
    /// Check if this outcome makes the preview available
    pub fn is_success(&self) -> bool {
        matches!(self, WatchOutcome::Success | WatchOutcome::ResidualSuccess)
    }

    /// Error lines recorded during the run, in arrival order
    pub fn errors(&self) -> &[String] {
        match self {
            WatchOutcome::CompileFailed { errors } | WatchOutcome::ResidualFailure { errors } => {
                errors
            }
            _ => &[],
        }
    }

    /// The caller-facing message rendered into the chat transcript
    pub fn user_message(&self) -> String {
        match self {
            WatchOutcome::BuildFailed { .. } => "Failed to build the Next.js application".into(),
            WatchOutcome::Success => "npm start completed successfully".into(),
            WatchOutcome::CompileFailed { errors } | WatchOutcome::ResidualFailure { errors } => {
                format!("npm start failed with errors:\n{}", errors.join("\n"))
            }
            WatchOutcome::TimedOut { after_secs } => {
                format!("npm start process timed out after {after_secs} seconds")
            }
            WatchOutcome::ResidualSuccess => {
                "npm start completed without obvious errors or success messages".into()
            }
        }
    }
}

/// One ordered piece of assistant output
///
/// Model text renders as-is; tool-call code arguments render as fenced blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code {
        language: Option<String>,
        code: String,
    },
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn code(language: Option<&str>, code: impl Into<String>) -> Self {
        Self::Code {
            language: language.map(str::to_string),
            code: code.into(),
        }
    }
}
