//! JSON-RPC message construction and classification for the worker wire.
//!
//! The worker expects whole-document synchronization, so `didChange`
//! always carries exactly one content change with no range.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{DiagnosticSeverity, SvDiagnostic};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub(crate) struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(id: u64, method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// A frame received from the worker, classified by shape.
#[derive(Debug)]
pub(crate) enum Incoming {
    /// Reply to one of our requests.
    Response { id: u64, body: serde_json::Value },
    /// A request from the worker that expects an answer.
    WorkerRequest {
        id: serde_json::Value,
        method: String,
    },
    /// A notification pushed by the worker.
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

/// Classify an incoming frame. Returns `None` for frames that fit no
/// JSON-RPC shape; the reader drops those.
pub(crate) fn classify(frame: &serde_json::Value) -> Option<Incoming> {
    let method = frame.get("method").and_then(|m| m.as_str());
    match (frame.get("id"), method) {
        (Some(id), Some(method)) => Some(Incoming::WorkerRequest {
            id: id.clone(),
            method: method.to_string(),
        }),
        (Some(id), None) => {
            if frame.get("result").is_none() && frame.get("error").is_none() {
                return None;
            }
            Some(Incoming::Response {
                id: id.as_u64()?,
                body: frame.clone(),
            })
        }
        (None, Some(method)) => Some(Incoming::Notification {
            method: method.to_string(),
            params: frame.get("params").cloned(),
        }),
        (None, None) => None,
    }
}

pub(crate) fn initialize_params(root_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": false
                },
                "publishDiagnostics": {
                    "relatedInformation": false
                }
            }
        },
        "workspaceFolders": [{
            "uri": root_uri,
            "name": "workspace"
        }]
    })
}

pub(crate) fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

/// Whole-document replacement: a single content change, no range.
pub(crate) fn did_change_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "version": version
        },
        "contentChanges": [{
            "text": text
        }]
    })
}

pub(crate) fn did_close_params(uri: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri
        }
    })
}

/// Watched-file change kinds, with their wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileChangeType {
    Created = 1,
    Changed = 2,
    Deleted = 3,
}

pub(crate) fn did_change_watched_files_params(
    changes: &[(String, FileChangeType)],
) -> serde_json::Value {
    let changes: Vec<serde_json::Value> = changes
        .iter()
        .map(|(uri, kind)| {
            serde_json::json!({
                "uri": uri,
                "type": *kind as u32
            })
        })
        .collect();
    serde_json::json!({ "changes": changes })
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<RawDiagnostic>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDiagnostic {
    pub range: RawRange,
    pub severity: Option<u64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRange {
    pub start: RawPosition,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPosition {
    pub line: u32,
    pub character: u32,
}

impl RawDiagnostic {
    /// Missing severity defaults to `Warning` at this boundary.
    pub fn to_diagnostic(&self) -> SvDiagnostic {
        SvDiagnostic::new(
            self.severity
                .and_then(DiagnosticSeverity::from_wire)
                .unwrap_or(DiagnosticSeverity::Warning),
            self.message.clone(),
            self.range.start.line,
            self.range.start.character,
        )
    }
}

pub(crate) fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

pub(crate) fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.to_file_path().ok())
}
