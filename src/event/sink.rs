// src/event/sink.rs

use std::fmt::Display;
use std::io::{self, Stdout, Write};

use chrono::SecondsFormat;

use crate::errors::{Result, RunwatchError};

use super::LifecycleEvent;

const SEPARATOR: &str = " | ";

/// Where emitted events go.
pub trait EventSink: Send {
    fn emit(&mut self, event: &LifecycleEvent) -> Result<()>;
}

/// Writes one pipe-delimited line per event and flushes after each.
#[derive(Debug)]
pub struct LineSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl LineSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> EventSink for LineSink<W> {
    fn emit(&mut self, event: &LifecycleEvent) -> Result<()> {
        let line = format_line(event);
        writeln!(self.out, "{line}")
            .and_then(|_| self.out.flush())
            .map_err(|e| RunwatchError::Sink(e.to_string()))
    }
}

/// Render an event in the fixed field order downstream tools parse.
///
/// Absent optional fields print as `-`.
pub fn format_line(event: &LifecycleEvent) -> String {
    let fields = [
        event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        event.kind.as_str().to_string(),
        format!("repo={}", event.repo),
        format!("run={}", event.run_id),
        format!("job={}", or_dash(event.job_id.as_ref())),
        format!("step={}", or_dash(event.step_number.as_ref())),
        format!("branch={}", or_dash(event.branch.as_ref())),
        format!("sha={}", or_dash(event.short_sha.as_ref())),
        format!("status={}", or_dash(event.status.as_ref())),
        format!("msg=\"{}\"", escape_message(&event.message)),
    ];
    fields.join(SEPARATOR)
}

fn or_dash<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Escape backslashes, double quotes and line breaks so the quoted
/// message field stays on one line and always terminates.
fn escape_message(msg: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    for c in msg.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
