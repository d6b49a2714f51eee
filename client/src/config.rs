//! Configuration surface for the bridge.
//!
//! Two optional overrides, each with a bundled default: the interpreter
//! used to launch the analysis server, and the server entry-point script.
//! Absence of either falls back to the default without error; whether the
//! resulting executable actually exists is the supervisor's concern at
//! `start` time.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::types::WorkerConfig;

const CONFIG_DIR: &str = "svbridge";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_INTERPRETER: &str = "python3";
const BUNDLED_SERVER_FILE: &str = "server.py";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    /// Interpreter used to launch the analysis server.
    #[serde(default)]
    pub interpreter: Option<PathBuf>,
    /// Entry-point script of the analysis server.
    #[serde(default)]
    pub server_path: Option<PathBuf>,
}

impl BridgeConfig {
    /// Load from the platform config dir. An absent file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Default location: `<config_dir>/svbridge/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path. An absent file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(Some(config))
    }

    /// Overlay `overrides` on top of `self`; set values in `overrides` win.
    #[must_use]
    pub fn merged_with(self, overrides: Self) -> Self {
        Self {
            interpreter: overrides.interpreter.or(self.interpreter),
            server_path: overrides.server_path.or(self.server_path),
        }
    }

    /// Resolve to worker launch parameters for `workspace_root`.
    #[must_use]
    pub fn worker_config(&self, workspace_root: &Path) -> WorkerConfig {
        let interpreter = self
            .interpreter
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERPRETER));
        let server = self.server_path.clone().unwrap_or_else(bundled_server_path);

        let mut config = WorkerConfig::new(interpreter, workspace_root);
        config.args = vec![server.to_string_lossy().into_owned()];
        config
    }
}

/// The server script shipped alongside the host binary.
fn bundled_server_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.join(BUNDLED_SERVER_FILE))
        .unwrap_or_else(|| PathBuf::from(BUNDLED_SERVER_FILE))
}
