//! Public types consumed by embedding hosts.
//!
//! A host constructs a [`WorkerConfig`], drives the supervisor through its
//! lifecycle, receives [`ClientEvent`]s on the observer channel registered
//! at construction, and reads [`DiagnosticsSnapshot`]s for display.

use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle phase of the supervised analysis worker.
///
/// `start` is legal only from the terminal states (`Stopped`, `Crashed`)
/// and moves through `Starting` to `Running`; `stop` moves through
/// `Stopping` to `Stopped`. `Crashed` is entered only when the worker
/// exits without a requested stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Crashed,
}

impl LifecycleState {
    /// Whether a new `start` attempt is legal from this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Crashed)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        }
    }
}

/// Launch parameters for the analysis worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Executable to launch: a bare name resolved on PATH or a full path.
    pub program: PathBuf,
    /// Arguments, typically the server entry-point script.
    pub args: Vec<String>,
    /// Working directory for the worker. Must be absolute; it also bounds
    /// which diagnostics are accepted back from the worker.
    pub working_dir: PathBuf,
    /// How long the initialize handshake may take before the attempt fails.
    pub init_timeout: Duration,
    /// Grace period for the worker to exit after a requested shutdown.
    pub shutdown_grace: Duration,
}

impl WorkerConfig {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            init_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

/// Errors surfaced by supervisor operations.
///
/// All variants are terminal to the triggering call: the caller is expected
/// to surface them to the user, not retry in a loop.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured executable is missing or not executable. The attempt
    /// is abandoned before any state transition or process spawn.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The worker spawned but never reached `Running`.
    #[error("worker failed to start: {0}")]
    StartFailure(String),
    /// The channel to the worker is gone.
    #[error("worker channel closed")]
    ChannelClosed,
}

/// An event reported on the supervisor's observer channel.
#[derive(Debug)]
pub enum ClientEvent {
    /// The worker moved between lifecycle states.
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// The worker exited without a requested stop. Always preceded by a
    /// `StateChanged` into [`LifecycleState::Crashed`].
    UnexpectedExit { detail: String },
    /// The worker published diagnostics for a file. An empty `items` list
    /// clears the file.
    Diagnostics {
        path: PathBuf,
        items: Vec<SvDiagnostic>,
    },
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Convert from the wire's numeric severity (1=Error .. 4=Hint).
    ///
    /// Returns `None` outside the defined range; the boundary decides the
    /// fallback.
    #[must_use]
    pub fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// A single diagnostic produced by the analysis worker.
///
/// Fields are private; construction goes through [`SvDiagnostic::new`] and
/// reads go through accessors.
#[derive(Debug, Clone)]
pub struct SvDiagnostic {
    severity: DiagnosticSeverity,
    message: String,
    /// 0-indexed line.
    line: u32,
    /// 0-indexed column.
    col: u32,
}

impl SvDiagnostic {
    #[must_use]
    pub fn new(severity: DiagnosticSeverity, message: String, line: u32, col: u32) -> Self {
        Self {
            severity,
            message,
            line,
            col,
        }
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 0-indexed line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 0-indexed column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Format as `path:line:col: severity: message`, 1-indexed for display.
    #[must_use]
    pub fn display_with_path(&self, path: &std::path::Path) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            path.display(),
            self.line + 1,
            self.col + 1,
            self.severity.label(),
            self.message,
        )
    }
}

/// Immutable snapshot of all diagnostics, suitable for rendering.
///
/// Counts are computed from the canonical per-file list rather than cached.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    /// Per-file diagnostics, files containing errors first.
    files: Vec<(PathBuf, Vec<SvDiagnostic>)>,
}

impl DiagnosticsSnapshot {
    pub(crate) fn new(files: Vec<(PathBuf, Vec<SvDiagnostic>)>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[(PathBuf, Vec<SvDiagnostic>)] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn count_by_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|d| d.severity() == severity)
            .count()
    }

    /// Number of error-level diagnostics.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Error)
    }

    /// Number of warning-level diagnostics.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Warning)
    }

    /// Total diagnostic count across all files.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }
}
