//! Debounced file-system watcher for the tracked document patterns.
//!
//! Feeds out-of-buffer changes (files touched outside the editor) to the
//! host, which forwards them through the sync bridge.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use globset::GlobSet;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache, new_debouncer,
};
use tokio::sync::mpsc;

use crate::sync::tracked_set;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A change observed on disk for a tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Watches a workspace recursively; dropping it stops the watch.
pub struct WorkspaceWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl WorkspaceWatcher {
    /// Watch `root` recursively. Tracked-file changes arrive, debounced,
    /// on the returned channel.
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<WatchedChange>)> {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let tracked = tracked_set();

        let mut debouncer = new_debouncer(
            DEBOUNCE_WINDOW,
            None,
            move |result: DebounceEventResult| {
                let Ok(events) = result else { return };
                for event in events {
                    if let Some(change) = to_change(&tracked, &event) {
                        let _ = tx.blocking_send(change);
                    }
                }
            },
        )
        .context("creating file watcher")?;

        debouncer
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", root.display()))?;

        Ok((Self { _debouncer: debouncer }, rx))
    }
}

fn to_change(tracked: &GlobSet, event: &DebouncedEvent) -> Option<WatchedChange> {
    let kind = match event.event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => return None,
    };

    let path = event.event.paths.first()?.clone();
    let name = path.file_name()?;
    if !tracked.is_match(name) {
        return None;
    }

    Some(WatchedChange { path, kind })
}
