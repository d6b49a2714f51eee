//! Sync bridge — full-document synchronization of tracked buffers.
//!
//! Every change the editor reports is rewritten into a single
//! whole-document replacement before it is forwarded, so the worker can
//! always be brought current by the most recent notification alone. The
//! bridge never applies or reconciles deltas, and it never mutates the
//! supervisor's lifecycle state: when the worker is not running, changes
//! are dropped silently and the next change after a restart re-opens the
//! document from scratch.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::protocol::{self, FileChangeType};
use crate::supervisor::Supervisor;
use crate::types::LifecycleState;
use crate::watcher::{ChangeKind, WatchedChange};

/// Document patterns mirrored to the worker.
pub const TRACKED_PATTERNS: &[&str] = &["*.v", "*.sv", "*.vh"];

/// Language identifier sent with `didOpen`.
const LANGUAGE_ID: &str = "systemverilog";

/// Build the matcher for [`TRACKED_PATTERNS`].
pub(crate) fn tracked_set() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in TRACKED_PATTERNS {
        builder.add(Glob::new(pattern).expect("tracked patterns are valid globs"));
    }
    builder.build().expect("tracked patterns build a valid set")
}

/// A change region as reported by the editor.
///
/// The bridge never inspects the region; the type exists so hosts can hand
/// over the raw event and rely on the bridge to discard it.
#[derive(Debug, Clone)]
pub struct ReportedChange {
    /// Region the editor claims changed; `None` for a whole-document edit.
    pub range: Option<ChangeRange>,
    /// Replacement text for the region.
    pub text: String,
}

/// Line/column region of a reported change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// Rewrites editor change events into full-document notifications.
pub struct SyncBridge {
    tracked: GlobSet,
    /// Per-document version counters, keyed by URI. Presence means the
    /// current worker has seen `didOpen` for the document.
    versions: HashMap<String, i32>,
    /// Worker generation the version table belongs to.
    generation: u64,
}

impl Default for SyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBridge {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracked: tracked_set(),
            versions: HashMap::new(),
            generation: 0,
        }
    }

    /// Whether `path` matches the tracked document patterns.
    #[must_use]
    pub fn tracks(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.tracked.is_match(name))
    }

    /// Handle an editor change event for `path`.
    ///
    /// `reported` is discarded in its entirety; the forwarded payload is
    /// always `full_text`. Forwards nothing unless the supervisor is
    /// `Running`; that is not an error, the next change re-synchronizes.
    /// The first contact with a document in the current worker generation
    /// sends `didOpen`; later contacts send `didChange` with an
    /// incremented version.
    pub async fn document_changed(
        &mut self,
        supervisor: &Supervisor,
        path: &Path,
        _reported: &[ReportedChange],
        full_text: &str,
    ) {
        if !self.tracks(path) {
            return;
        }
        if supervisor.state() != LifecycleState::Running {
            tracing::trace!(path = %path.display(), "change dropped; worker not running");
            return;
        }
        self.adopt_generation(supervisor);

        let uri = match protocol::path_to_file_uri(path) {
            Ok(uri) => uri.to_string(),
            Err(e) => {
                tracing::warn!("skipping change notification: {e}");
                return;
            }
        };

        let (method, params) = match self.versions.entry(uri.clone()) {
            Entry::Occupied(mut entry) => {
                let version = entry.get_mut();
                *version += 1;
                (
                    "textDocument/didChange",
                    protocol::did_change_params(&uri, *version, full_text),
                )
            }
            Entry::Vacant(entry) => {
                entry.insert(1);
                (
                    "textDocument/didOpen",
                    protocol::did_open_params(&uri, LANGUAGE_ID, 1, full_text),
                )
            }
        };

        if let Err(e) = supervisor.send_notification(method, Some(params)).await {
            tracing::warn!(path = %path.display(), "failed to forward {method}: {e}");
        }
    }

    /// Handle an editor close event for `path`.
    pub async fn document_closed(&mut self, supervisor: &Supervisor, path: &Path) {
        if !self.tracks(path) {
            return;
        }
        if supervisor.state() != LifecycleState::Running {
            return;
        }
        self.adopt_generation(supervisor);

        let Ok(uri) = protocol::path_to_file_uri(path) else {
            return;
        };
        let uri = uri.to_string();
        if self.versions.remove(&uri).is_none() {
            // Never opened in this generation; the worker has no state.
            return;
        }

        let params = protocol::did_close_params(&uri);
        if let Err(e) = supervisor
            .send_notification("textDocument/didClose", Some(params))
            .await
        {
            tracing::warn!(path = %path.display(), "failed to forward didClose: {e}");
        }
    }

    /// Forward a batch of out-of-buffer file changes, unmodified, for the
    /// tracked patterns.
    pub async fn watched_files_changed(&self, supervisor: &Supervisor, changes: &[WatchedChange]) {
        let changes: Vec<(String, FileChangeType)> = changes
            .iter()
            .filter(|change| self.tracks(&change.path))
            .filter_map(|change| {
                let uri = protocol::path_to_file_uri(&change.path).ok()?;
                let kind = match change.kind {
                    ChangeKind::Created => FileChangeType::Created,
                    ChangeKind::Modified => FileChangeType::Changed,
                    ChangeKind::Deleted => FileChangeType::Deleted,
                };
                Some((uri.to_string(), kind))
            })
            .collect();

        if changes.is_empty() {
            return;
        }
        if supervisor.state() != LifecycleState::Running {
            tracing::trace!("watched-file changes dropped; worker not running");
            return;
        }

        let params = protocol::did_change_watched_files_params(&changes);
        if let Err(e) = supervisor
            .send_notification("workspace/didChangeWatchedFiles", Some(params))
            .await
        {
            tracing::warn!("failed to forward watched-file changes: {e}");
        }
    }

    /// Forget all document state if the worker generation moved on; a
    /// fresh worker has never seen any of our documents.
    fn adopt_generation(&mut self, supervisor: &Supervisor) {
        let current = supervisor.generation();
        if self.generation != current {
            self.versions.clear();
            self.generation = current;
        }
    }
}
