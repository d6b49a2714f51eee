//! svbridge — standalone host for the SystemVerilog analysis bridge.
//!
//! Wires the library to a real workspace: loads configuration, starts the
//! supervisor, mirrors every tracked file (`*.v`, `*.sv`, `*.vh`) to the
//! worker as a whole-document snapshot, and prints the diagnostics the
//! worker pushes back.
//!
//! SIGHUP restarts the worker; Ctrl-C stops it and exits. The worker is
//! never restarted automatically: a crash is reported and the bridge
//! waits for an explicit restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use svbridge_client::{
    BridgeConfig, ChangeKind, ClientEvent, DiagnosticsStore, Supervisor, SyncBridge, WatchedChange,
    WorkspaceWatcher,
};
use tracing_subscriber::EnvFilter;

/// Budget for draining supervisor events per tick.
const EVENT_BUDGET: usize = 64;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(
    name = "svbridge",
    about = "Supervise the SystemVerilog analysis server and mirror workspace files to it"
)]
struct Args {
    /// Workspace root to watch.
    #[arg(default_value = ".")]
    workspace: PathBuf,

    /// Interpreter used to launch the analysis server.
    #[arg(long)]
    interpreter: Option<PathBuf>,

    /// Entry-point script of the analysis server.
    #[arg(long)]
    server: Option<PathBuf>,

    /// Configuration file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let file_config = match &args.config {
        Some(path) => match BridgeConfig::load_from(path)? {
            Some(config) => config,
            None => bail!("config file not found: {}", path.display()),
        },
        None => BridgeConfig::load()?.unwrap_or_default(),
    };

    let overrides = BridgeConfig {
        interpreter: args.interpreter.clone(),
        server_path: args.server.clone(),
    };
    Ok(file_config.merged_with(overrides))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let workspace = args
        .workspace
        .canonicalize()
        .with_context(|| format!("resolving workspace {}", args.workspace.display()))?;
    let config = load_config(&args)?;

    let (mut supervisor, mut events) = Supervisor::new(config.worker_config(&workspace));
    let mut bridge = SyncBridge::new();
    let mut store = DiagnosticsStore::new();

    supervisor.start().await?;

    open_workspace(&supervisor, &mut bridge, &workspace).await;

    let (_watcher, mut changes) = WorkspaceWatcher::start(&workspace)?;
    let mut restart = restart_signal::RestartSignal::new()?;
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                supervisor.stop().await;
                break;
            }
            () = restart.recv() => {
                if let Err(e) = supervisor.restart().await {
                    tracing::error!("restart failed: {e}");
                }
            }
            maybe = changes.recv() => {
                let Some(change) = maybe else { break };
                handle_change(&supervisor, &mut bridge, change).await;
            }
            Some(event) = events.recv() => {
                handle_event(&mut store, event);
            }
            _ = tick.tick() => {
                supervisor.process_events(EVENT_BUDGET);
            }
        }
    }

    Ok(())
}

/// Mirror every tracked file already in the workspace to the worker.
async fn open_workspace(supervisor: &Supervisor, bridge: &mut SyncBridge, root: &Path) {
    let mut opened = 0usize;
    for entry in ignore::WalkBuilder::new(root).build().flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) || !bridge.tracks(path) {
            continue;
        }
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                bridge.document_changed(supervisor, path, &[], &text).await;
                opened += 1;
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), "skipping unreadable file: {e}");
            }
        }
    }
    tracing::info!(count = opened, "workspace files mirrored to the worker");
}

/// Feed one watcher event through the bridge. The standalone host plays
/// both roles: it forwards the watched-file notification and re-syncs the
/// file content as the editor buffer.
async fn handle_change(supervisor: &Supervisor, bridge: &mut SyncBridge, change: WatchedChange) {
    bridge
        .watched_files_changed(supervisor, std::slice::from_ref(&change))
        .await;

    match change.kind {
        ChangeKind::Created | ChangeKind::Modified => {
            match tokio::fs::read_to_string(&change.path).await {
                Ok(text) => {
                    bridge
                        .document_changed(supervisor, &change.path, &[], &text)
                        .await;
                }
                Err(e) => {
                    tracing::debug!(path = %change.path.display(), "skipping unreadable file: {e}");
                }
            }
        }
        ChangeKind::Deleted => bridge.document_closed(supervisor, &change.path).await,
    }
}

fn handle_event(store: &mut DiagnosticsStore, event: ClientEvent) {
    match event {
        ClientEvent::StateChanged { from, to } => {
            tracing::info!(from = from.label(), to = to.label(), "worker state changed");
        }
        ClientEvent::UnexpectedExit { detail } => {
            tracing::warn!("analysis worker stopped unexpectedly: {detail} (send SIGHUP to restart)");
        }
        ClientEvent::Diagnostics { path, items } => {
            for diag in &items {
                println!("{}", diag.display_with_path(&path));
            }
            store.update(path, items);
            let snapshot = store.snapshot();
            tracing::debug!(
                errors = snapshot.error_count(),
                warnings = snapshot.warning_count(),
                "diagnostics updated"
            );
        }
    }
}

#[cfg(unix)]
mod restart_signal {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    /// SIGHUP, bound to the user-facing "restart the worker" action.
    pub struct RestartSignal(Signal);

    impl RestartSignal {
        pub fn new() -> std::io::Result<Self> {
            Ok(Self(signal(SignalKind::hangup())?))
        }

        pub async fn recv(&mut self) {
            self.0.recv().await;
            tracing::info!("restart requested");
        }
    }
}

#[cfg(not(unix))]
mod restart_signal {
    /// No restart signal on this platform; the future never resolves.
    pub struct RestartSignal;

    impl RestartSignal {
        pub fn new() -> std::io::Result<Self> {
            Ok(Self)
        }

        pub async fn recv(&mut self) {
            std::future::pending::<()>().await;
        }
    }
}
