//! Append-only execution journal.
//!
//! Every entry is mirrored to the `log` facade and kept in memory so the
//! whole run can be embedded into each rendered artifact.

use chrono::{DateTime, Local};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
    pub at: DateTime<Local>,
}

impl LogLine {
    pub fn render(&self) -> String {
        format!(
            "{} {} {}",
            self.at.format("%Y-%m-%d %H:%M:%S,%3f"),
            self.level.label(),
            self.text
        )
    }
}

/// Grows for the lifetime of the process; never cleared.
#[derive(Debug, Default)]
pub struct ExecutionJournal {
    lines: Vec<LogLine>,
}

impl ExecutionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, level: LogLevel, msg: impl Into<String>) {
        let text = msg.into();

        match level {
            LogLevel::Info | LogLevel::Success => log::info!("{text}"),
            LogLevel::Warn => log::warn!("{text}"),
            LogLevel::Error => log::error!("{text}"),
        }

        self.lines.push(LogLine {
            level,
            text,
            at: Local::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of everything logged so far, one rendered line per entry.
    pub fn snapshot(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }
}
