//! Logging configuration.
//!
//! A `LogConfig` is built once in `main` from flags and the environment and
//! handed by reference to whatever emits output: the tracing subscriber for
//! diagnostics and the [`Console`](crate::console::Console) for user-facing
//! messages. Nothing reads logging settings from process-global state.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriter;

/// Crates whose diagnostics `-v` turns on.
const OWN_TARGETS: [&str; 3] = ["playground_cli", "playground_tracker", "playground_kube_client"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only.
    Normal,
    /// Debug diagnostics from this tool.
    Debug,
    /// Everything, including HTTP client internals.
    Trace,
}

impl Verbosity {
    /// `-v` count, raised to `Debug` when `LOG_LEVEL=debug`.
    pub fn from_flags(verbose: u8, log_level: Option<&str>) -> Self {
        let from_count = match verbose {
            0 => Self::Normal,
            1 => Self::Debug,
            _ => Self::Trace,
        };
        let from_env = match log_level.map(str::to_ascii_lowercase).as_deref() {
            Some("debug") => Self::Debug,
            Some("trace") => Self::Trace,
            _ => Self::Normal,
        };
        from_count.max(from_env)
    }

    fn directive(self) -> String {
        match self {
            Self::Normal => "warn".to_string(),
            Self::Debug => std::iter::once("warn".to_string())
                .chain(OWN_TARGETS.iter().map(|t| format!("{t}=debug")))
                .collect::<Vec<_>>()
                .join(","),
            Self::Trace => std::iter::once("debug".to_string())
                .chain(OWN_TARGETS.iter().map(|t| format!("{t}=trace")))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Where output goes.
#[derive(Clone)]
pub enum Sink {
    Terminal,
    /// In-memory buffers, used by tests.
    Captured {
        stdout: CapturedOutput,
        stderr: CapturedOutput,
    },
}

#[derive(Clone)]
pub struct LogConfig {
    pub verbosity: Verbosity,
    pub color: bool,
    pub sink: Sink,
}

impl LogConfig {
    /// Settings for an interactive run. Color is used only when requested
    /// and the terminal supports it.
    pub fn for_terminal(verbosity: Verbosity, no_color: bool) -> Self {
        let color = !no_color
            && std::env::var_os("NO_COLOR").is_none()
            && supports_color::on(supports_color::Stream::Stderr).is_some();
        Self {
            verbosity,
            color,
            sink: Sink::Terminal,
        }
    }

    /// Uncolored settings writing into fresh buffers.
    pub fn captured(verbosity: Verbosity) -> (Self, CapturedOutput, CapturedOutput) {
        let stdout = CapturedOutput::default();
        let stderr = CapturedOutput::default();
        let config = Self {
            verbosity,
            color: false,
            sink: Sink::Captured {
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            },
        };
        (config, stdout, stderr)
    }

    fn env_filter(&self) -> EnvFilter {
        if self.verbosity == Verbosity::Normal
            && let Ok(filter) = EnvFilter::try_from_default_env()
        {
            return filter;
        }
        EnvFilter::new(self.verbosity.directive())
    }
}

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LogConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_ansi(config.color)
        .with_target(false);

    let _ = match &config.sink {
        Sink::Terminal => builder.with_writer(io::stderr).try_init(),
        Sink::Captured { stderr, .. } => builder.with_writer(stderr.clone()).try_init(),
    };
}

/// Shared in-memory byte buffer that implements `MakeWriter`.
#[derive(Clone, Default)]
pub struct CapturedOutput {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn contents(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&guard).into_owned()
    }

    pub(crate) fn append(&self, data: &[u8]) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }
}

impl<'a> MakeWriter<'a> for CapturedOutput {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            target: self.clone(),
        }
    }
}

/// Writer that appends to a [`CapturedOutput`].
pub struct CapturedWriter {
    target: CapturedOutput,
}

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.target.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
