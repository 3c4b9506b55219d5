//! Colored terminal output for build runs
//!
//! Progress goes to stdout. Warnings and errors go to stderr.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    stderr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            stderr: BufferWriter::stderr(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(&self, wtr: &BufferWriter, marker: Option<(&str, ColorSpec)>, body: Option<ColorSpec>, message: &str) {
        let mut buffer = wtr.buffer();
        if let Some((symbol, spec)) = marker {
            let _ = buffer.set_color(&spec);
            let _ = write!(&mut buffer, "{}", symbol);
            let _ = buffer.reset();
            let _ = write!(&mut buffer, " ");
        }
        if let Some(spec) = body {
            let _ = buffer.set_color(&spec);
        }
        let _ = writeln!(&mut buffer, "{}", message);
        let _ = buffer.reset();
        let _ = wtr.print(&buffer);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Green)).set_bold(true);
        self.emit(&self.stdout, Some(("✓", marker)), None, message);
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Magenta));
        self.emit(&self.stdout, Some(("⋯", marker)), None, message);
    }

    /// Print a warning message (stderr, shown even when quiet)
    pub fn warn(&self, message: &str) {
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Yellow)).set_bold(true);
        let mut body = ColorSpec::new();
        body.set_fg(Some(Color::Yellow));
        self.emit(&self.stderr, Some(("⚠", marker)), Some(body), message);
    }

    /// Print an error message (stderr, always shown)
    pub fn error(&self, message: &str) {
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Red)).set_bold(true);
        let mut body = ColorSpec::new();
        body.set_fg(Some(Color::Red));
        self.emit(&self.stderr, Some(("✗", marker)), Some(body), message);
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) {
        if !self.verbose || self.quiet {
            return;
        }
        self.emit(&self.stdout, None, None, &format!("    {}", message));
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Cyan)).set_bold(true);
        self.emit(&self.stdout, None, Some(spec), &format!("\n═══ {} ═══", title));
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(&self.stdout, None, None, &format!("    {}", message));
    }

    /// Print a plain message
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.emit(&self.stdout, None, None, message);
    }
}
