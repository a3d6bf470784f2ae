use crate::logging::context::ExecutionContext;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// Console layer: compact lines without timestamps, since build progress is read live.
pub type ConsoleFmtLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Compact, ()>, BoxMakeWriter>;

/// Stream that receives console log lines.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

impl ConsoleOutput {
    const NAMES: [(&'static str, ConsoleOutput); 3] = [
        ("stdout", ConsoleOutput::Stdout),
        ("stderr", ConsoleOutput::Stderr),
        ("none", ConsoleOutput::None),
    ];

    pub fn as_str(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, output)| *output == self)
            .map(|(name, _)| *name)
            .unwrap_or("none")
    }

    fn writer(self) -> BoxMakeWriter {
        match self {
            ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
            ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
            ConsoleOutput::None => BoxMakeWriter::new(io::sink),
        }
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, output)| *output)
            .ok_or_else(|| {
                format!(
                    "invalid console output '{}' (expected stdout, stderr or none)",
                    value
                )
            })
    }
}

/// Pick the console stream: stderr while developing, silent in CI unless configured.
///
/// Command output (build summaries, DOT, explain JSON) goes to stdout, so log
/// lines stay on stderr by default.
pub fn select_console_output(
    context: ExecutionContext,
    configured: Option<ConsoleOutput>,
) -> ConsoleOutput {
    configured.unwrap_or(match context {
        ExecutionContext::LocalDev => ConsoleOutput::Stderr,
        ExecutionContext::Ci => ConsoleOutput::None,
    })
}

pub fn console_layer<S>(output: ConsoleOutput) -> ConsoleFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    console_layer_with_writer(output.writer())
}

/// Console layer writing to an arbitrary sink.
pub fn console_layer_with_writer<S, W>(writer: W) -> ConsoleFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .with_writer(BoxMakeWriter::new(writer))
}
