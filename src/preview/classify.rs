//! Output line classification for the build/serve watcher

use regex::Regex;

use crate::common::prelude::*;

/// Default pattern marking a line as a successful compile
pub const DEFAULT_SUCCESS_PATTERN: &str = "Compiled successfully|webpack compiled successfully";

/// Default pattern marking a line as a compile error
pub const DEFAULT_ERROR_PATTERN: &str = "Failed to compile|Error:|ERROR in";

/// Substring of the bundler's final compile-summary line.
///
/// Once error lines have been recorded, seeing this summary means the compile
/// is over and the recorded errors are complete.
pub const COMPILE_SUMMARY_MARKER: &str = "webpack compiled with";

/// Classification of a single output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Success,
    Error,
    Neutral,
}

/// Classifies process output lines against a success/error pattern pair.
///
/// Classification is a pure function of the line text: the same line always
/// yields the same class regardless of arrival order. Success takes
/// precedence when a line matches both patterns.
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    success: Regex,
    error: Regex,
}

impl OutputClassifier {
    /// Compile a classifier from a pattern pair.
    ///
    /// Patterns come from user config, so compilation is fallible.
    pub fn new(success_pattern: &str, error_pattern: &str) -> Result<Self> {
        let success = Regex::new(success_pattern)
            .map_err(|e| Error::pattern(format!("invalid success pattern: {}", e)))?;
        let error = Regex::new(error_pattern)
            .map_err(|e| Error::pattern(format!("invalid error pattern: {}", e)))?;
        Ok(Self { success, error })
    }

    pub fn classify(&self, text: &str) -> LineClass {
        if self.success.is_match(text) {
            LineClass::Success
        } else if self.error.is_match(text) {
            LineClass::Error
        } else {
            LineClass::Neutral
        }
    }

    /// Check for the bundler's final compile-summary line
    pub fn is_compile_summary(&self, text: &str) -> bool {
        text.contains(COMPILE_SUMMARY_MARKER)
    }
}

impl Default for OutputClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_PATTERN, DEFAULT_ERROR_PATTERN)
            .expect("Default classifier patterns are valid")
    }
}
