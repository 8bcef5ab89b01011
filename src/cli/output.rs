//! Terminal output for CLI progress.
//!
//! Progress and results go to stdout, warnings to stderr. Diagnostic detail
//! belongs in `log`, not here. Colors are dropped when the stream is not a
//! terminal or `NO_COLOR` is set.

use std::io::{self, IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Verbosity-aware printer used by [`super::RuntimeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    stdout_color: ColorChoice,
    stderr_color: ColorChoice,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            stdout_color: color_choice(io::stdout().is_terminal()),
            stderr_color: color_choice(io::stderr().is_terminal()),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Printed only with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.is_verbose() {
            let stdout = StandardStream::stdout(self.stdout_color);
            writeln!(stdout.lock(), "{}", message)?;
        }
        Ok(())
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let stdout = StandardStream::stdout(self.stdout_color);
        write_marked(&mut stdout.lock(), "***", Color::Cyan, message)
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let stdout = StandardStream::stdout(self.stdout_color);
        write_marked(&mut stdout.lock(), "✓", Color::Green, message)
    }

    pub fn warn(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let stderr = StandardStream::stderr(self.stderr_color);
        write_marked(&mut stderr.lock(), "⚠", Color::Yellow, message)
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let stdout = StandardStream::stdout(self.stdout_color);
        write_section(&mut stdout.lock(), title)
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            let stdout = StandardStream::stdout(self.stdout_color);
            writeln!(stdout.lock(), "   {}", message)?;
        }
        Ok(())
    }
}

fn color_choice(is_terminal: bool) -> ColorChoice {
    if is_terminal {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// `<marker> <message>` with only the marker colored.
fn write_marked<W: WriteColor>(
    out: &mut W,
    marker: &str,
    color: Color,
    message: &str,
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", marker)?;
    out.reset()?;
    writeln!(out, " {}", message)
}

/// Blank line, bold title, underline.
fn write_section<W: WriteColor>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", title)?;
    out.reset()?;
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::Buffer;

    fn text(buffer: &Buffer) -> String {
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    #[test]
    fn plain_stream_gets_no_escape_codes() {
        let mut buffer = Buffer::no_color();
        write_marked(&mut buffer, "✓", Color::Green, "Repository closed").unwrap();
        write_section(&mut buffer, "Staging").unwrap();
        assert_eq!(text(&buffer), "✓ Repository closed\n\nStaging\n=======\n");
    }

    #[test]
    fn markers_carry_their_colors() {
        let mut success = Buffer::ansi();
        write_marked(&mut success, "✓", Color::Green, "done").unwrap();
        let success = text(&success);
        assert!(success.contains("\x1b[32m"), "{success:?}");
        assert!(success.ends_with("\x1b[0m done\n"), "{success:?}");

        let mut warning = Buffer::ansi();
        write_marked(&mut warning, "⚠", Color::Yellow, "left open").unwrap();
        assert!(text(&warning).contains("\x1b[33m"));
    }

    #[test]
    fn section_title_is_bold() {
        let mut buffer = Buffer::ansi();
        write_section(&mut buffer, "Release").unwrap();
        let out = text(&buffer);
        assert!(out.contains("\x1b[1m"), "{out:?}");
        assert!(out.ends_with("Release\x1b[0m\n=======\n"), "{out:?}");
    }

    #[test]
    fn quiet_suppresses_everything_but_errors() {
        let output = OutputManager::new(true, true);
        assert!(!output.is_verbose());
        assert!(output.progress("hidden").is_ok());
        assert!(output.warn("hidden").is_ok());
    }

    #[test]
    fn non_terminal_streams_disable_color() {
        assert_eq!(color_choice(false), ColorChoice::Never);
        assert_eq!(color_choice(true), ColorChoice::Auto);
    }
}
