//! User-facing output.
//!
//! Command results go to stdout uncolored so they can be piped. Status
//! lines go to stderr and are colored by level when the [`LogConfig`]
//! allows it.

use std::io::Write;

use owo_colors::{OwoColorize, Style};

use crate::logging::{LogConfig, Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
    Success,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warning",
            Level::Error => "error",
            Level::Success => "ok",
        }
    }

    fn style(self) -> Style {
        match self {
            Level::Info => Style::new().green(),
            Level::Warn => Style::new().yellow(),
            Level::Error => Style::new().red(),
            Level::Success => Style::new().bold().green(),
        }
    }
}

pub struct Console {
    color: bool,
    sink: Sink,
}

impl Console {
    pub fn new(config: &LogConfig) -> Self {
        Self {
            color: config.color,
            sink: config.sink.clone(),
        }
    }

    /// Command output on stdout.
    pub fn print(&self, line: impl AsRef<str>) {
        let line = format!("{}\n", line.as_ref());
        match &self.sink {
            Sink::Terminal => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(line.as_bytes());
                let _ = out.flush();
            }
            Sink::Captured { stdout, .. } => stdout.append(line.as_bytes()),
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.status(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.status(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.status(Level::Error, message.as_ref());
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.status(Level::Success, message.as_ref());
    }

    fn status(&self, level: Level, message: &str) {
        let line = if self.color {
            format!("{} {message}\n", format!("{}:", level.label()).style(level.style()))
        } else {
            format!("{}: {message}\n", level.label())
        };
        match &self.sink {
            Sink::Terminal => {
                let _ = std::io::stderr().lock().write_all(line.as_bytes());
            }
            Sink::Captured { stderr, .. } => stderr.append(line.as_bytes()),
        }
    }
}
