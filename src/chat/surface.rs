//! Display surface the chat runner renders into

use std::path::Path;

use url::Url;

use crate::common::error::Result;
use crate::core::Segment;

/// Where assistant output and session notices are rendered
///
/// Assistant output arrives as ordered segments: model text as-is, tool-call
/// code arguments as code blocks. Notices are out-of-band status lines.
pub trait ChatSurface {
    /// Render one ordered piece of assistant output
    fn assistant_segment(&mut self, segment: &Segment) -> Result<()>;

    /// Render an out-of-band status line
    fn notice(&mut self, text: &str) -> Result<()>;

    /// Announce that the component preview is being served
    fn preview_ready(&mut self, url: &Url) -> Result<()>;

    /// Announce a file fetched from the sandbox for the user
    fn file_ready(&mut self, path: &Path) -> Result<()>;

    /// Announce a chart image produced by a code execution
    fn image_ready(&mut self, path: &Path) -> Result<()>;
}
