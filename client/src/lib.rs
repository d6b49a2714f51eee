//! Client-side bridge for the SystemVerilog analysis worker.
//!
//! Two composed pieces: a [`Supervisor`] that owns the out-of-process
//! worker (spawn, handshake, graceful stop, restart, crash detection) and
//! a [`SyncBridge`] that rewrites every editor change into a
//! whole-document notification so the worker's text model can never drift
//! from the editor's buffers.

pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod sync;
pub mod types;
pub mod watcher;

pub(crate) mod protocol;

mod supervisor;

pub use config::BridgeConfig;
pub use diagnostics::DiagnosticsStore;
pub use supervisor::Supervisor;
pub use sync::{ChangeRange, ReportedChange, SyncBridge, TRACKED_PATTERNS};
pub use types::{
    ClientError, ClientEvent, DiagnosticSeverity, DiagnosticsSnapshot, LifecycleState,
    SvDiagnostic, WorkerConfig,
};
pub use watcher::{ChangeKind, WatchedChange, WorkspaceWatcher};
