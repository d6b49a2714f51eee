//! Diagnostics store — accumulates per-file diagnostics from the worker.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::{DiagnosticsSnapshot, SvDiagnostic};

/// Latest published diagnostics per file. The worker clears a file by
/// publishing an empty list for it.
#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    data: HashMap<PathBuf, Vec<SvDiagnostic>>,
}

impl DiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, path: PathBuf, items: Vec<SvDiagnostic>) {
        if items.is_empty() {
            self.data.remove(&path);
        } else {
            self.data.insert(path, items);
        }
    }

    /// Immutable snapshot, files containing errors first, then by path.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let mut files: Vec<(PathBuf, Vec<SvDiagnostic>)> = self
            .data
            .iter()
            .map(|(path, items)| (path.clone(), items.clone()))
            .collect();

        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot::new(files)
    }
}
