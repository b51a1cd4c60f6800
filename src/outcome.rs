// Export outcomes and the sinks that observe them

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error};

/// Filesystem step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateDir,
    Write,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateDir => write!(f, "create directory"),
            Action::Write => write!(f, "write"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

/// Result of one handler invocation
///
/// Handlers never fail towards the host; failures end up here instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, bytes: usize },
    Removed { path: PathBuf },
    /// Delete of a file that did not exist
    AlreadyAbsent { path: PathBuf },
    Skipped { reason: String },
    Failed { action: Action, path: PathBuf, error: String },
}

impl ExportOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExportOutcome::Failed { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ExportOutcome::Written { path, .. }
            | ExportOutcome::Removed { path }
            | ExportOutcome::AlreadyAbsent { path }
            | ExportOutcome::Failed { path, .. } => Some(path),
            ExportOutcome::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::Written { path, bytes } => {
                write!(f, "wrote {} ({} bytes)", path.display(), bytes)
            }
            ExportOutcome::Removed { path } => write!(f, "removed {}", path.display()),
            ExportOutcome::AlreadyAbsent { path } => write!(f, "already absent {}", path.display()),
            ExportOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            ExportOutcome::Failed { action, path, error } => {
                write!(f, "failed to {} {}: {}", action, path.display(), error)
            }
        }
    }
}

/// Observer for export outcomes
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: &ExportOutcome);
}

/// Reports outcomes through tracing; failures at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn record(&self, outcome: &ExportOutcome) {
        match outcome {
            ExportOutcome::Failed { action, path, error } => {
                error!(%action, path = ?path, error = %error, "Export failed");
            }
            other => debug!(outcome = %other, "Export"),
        }
    }
}

/// Counters over everything recorded so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub written: u64,
    pub removed: u64,
    pub already_absent: u64,
    pub skipped: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

impl ExportStats {
    pub fn total(&self) -> u64 {
        self.written + self.removed + self.already_absent + self.skipped + self.failed
    }
}

/// Counts outcomes, then forwards them to [`LogSink`]
#[derive(Debug, Default)]
pub struct StatsSink {
    stats: Mutex<ExportStats>,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ExportStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutcomeSink for StatsSink {
    fn record(&self, outcome: &ExportOutcome) {
        {
            let mut stats = match self.stats.lock() {
                Ok(stats) => stats,
                Err(poisoned) => poisoned.into_inner(),
            };
            match outcome {
                ExportOutcome::Written { .. } => stats.written += 1,
                ExportOutcome::Removed { .. } => stats.removed += 1,
                ExportOutcome::AlreadyAbsent { .. } => stats.already_absent += 1,
                ExportOutcome::Skipped { .. } => stats.skipped += 1,
                ExportOutcome::Failed { .. } => {
                    stats.failed += 1;
                    stats.last_error = Some(outcome.to_string());
                }
            }
        }
        LogSink.record(outcome);
    }
}
