//! Ordered, user-facing record of a single run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// What a log entry reports, used to pick its styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    /// The random number drawn.
    Draw,
    /// The corpus passage that was revealed.
    Verse,
    /// The resonance verdict.
    Analysis,
    /// The reduced chart for the chosen date.
    Chart,
    /// The entity category the verse inspired.
    Inspiration,
    /// A chapter was written and saved.
    Success,
    /// The run ended without a chapter, as a normal outcome.
    Silence,
    /// The run failed.
    Error,
}

/// One message in the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == LogKind::Error
    }
}

/// Messages from one run, optionally mirrored to a live listener.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    progress: Option<UnboundedSender<LogEntry>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward every entry to `progress` as it is pushed.
    pub fn with_progress(progress: UnboundedSender<LogEntry>) -> Self {
        Self {
            entries: Vec::new(),
            progress: Some(progress),
        }
    }

    pub fn push(&mut self, kind: LogKind, text: impl Into<String>) {
        let entry = LogEntry::new(kind, text);
        if let Some(tx) = &self.progress {
            // A listener that went away only misses the live view
            let _ = tx.send(entry.clone());
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn contains(&self, kind: LogKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
