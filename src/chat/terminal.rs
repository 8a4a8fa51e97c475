//! Line-oriented terminal rendering

use std::io::{self, Write};
use std::path::Path;

use url::Url;

use crate::chat::surface::ChatSurface;
use crate::common::error::Result;
use crate::core::Segment;

/// Renders assistant segments and notices to any writer
///
/// Text segments print as-is, code segments as fenced blocks, notices as
/// `*`-prefixed status lines. Generic over the writer so tests can capture
/// output in a buffer.
pub struct TerminalSurface<W: Write> {
    writer: W,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChatSurface for TerminalSurface<W> {
    fn assistant_segment(&mut self, segment: &Segment) -> Result<()> {
        match segment {
            Segment::Text(text) => {
                writeln!(self.writer, "{text}\n")?;
            }
            Segment::Code { language, code } => {
                writeln!(self.writer, "```{}", language.as_deref().unwrap_or(""))?;
                writeln!(self.writer, "{code}")?;
                writeln!(self.writer, "```\n")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "* {text}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn preview_ready(&mut self, url: &Url) -> Result<()> {
        self.notice(&format!("Preview ready: {url}"))
    }

    fn file_ready(&mut self, path: &Path) -> Result<()> {
        self.notice(&format!("File ready: {}", path.display()))
    }

    fn image_ready(&mut self, path: &Path) -> Result<()> {
        self.notice(&format!("Chart saved: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn capture(render: impl FnOnce(&mut TerminalSurface<Vec<u8>>)) -> String {
        let mut surface = TerminalSurface::new(Vec::new());
        render(&mut surface);
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn test_text_segment_spacing() {
        let output = capture(|s| {
            s.assistant_segment(&Segment::text("Here you go.")).unwrap();
        });
        assert_eq!(output, "Here you go.\n\n");
    }

    #[test]
    fn test_code_segment_fenced() {
        let output = capture(|s| {
            s.assistant_segment(&Segment::code(Some("python"), "print(1)"))
                .unwrap();
        });
        assert_eq!(output, "```python\nprint(1)\n```\n\n");
    }

    #[test]
    fn test_code_segment_without_language() {
        let output = capture(|s| {
            s.assistant_segment(&Segment::code(None, "x = 1")).unwrap();
        });
        assert!(output.starts_with("```\n"));
    }

    #[test]
    fn test_conversation_rendering() {
        let output = capture(|s| {
            s.assistant_segment(&Segment::text("Let me plot that.")).unwrap();
            s.assistant_segment(&Segment::code(Some("python"), "plt.plot(xs, ys)"))
                .unwrap();
            s.notice("Running execute_python").unwrap();
            s.image_ready(Path::new("/work/chart.png")).unwrap();
        });

        assert_snapshot!(output, @r"
        Let me plot that.

        ```python
        plt.plot(xs, ys)
        ```

        * Running execute_python
        * Chart saved: /work/chart.png
        ");
    }

    #[test]
    fn test_preview_notice_carries_url() {
        let url = Url::parse("http://localhost:3000/?t=1700000000").unwrap();
        let output = capture(|s| {
            s.preview_ready(&url).unwrap();
        });
        assert_eq!(output, "* Preview ready: http://localhost:3000/?t=1700000000\n");
    }

    #[test]
    fn test_file_notice() {
        let output = capture(|s| {
            s.file_ready(Path::new("/work/downloads/report.csv")).unwrap();
        });
        assert_eq!(output, "* File ready: /work/downloads/report.csv\n");
    }
}
