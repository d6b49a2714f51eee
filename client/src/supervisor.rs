//! Transport supervisor — owns the worker process and its channel.
//!
//! The supervisor is the single mutator of lifecycle state. It is designed
//! to be owned by one task: every lifecycle operation takes `&mut self`,
//! so overlapping `start`/`stop`/`restart` calls are unrepresentable and
//! no two worker processes can ever race for the channel.
//!
//! Two I/O tasks are spawned per worker: a writer draining a command
//! channel into the worker's stdin, and a reader classifying frames from
//! its stdout. The reader reports worker death and diagnostics back on an
//! internal channel which [`Supervisor::process_events`] drains; every
//! state transition is mirrored to the observer channel handed out by
//! [`Supervisor::new`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{self, Incoming};
use crate::types::{ClientError, ClientEvent, LifecycleState, SvDiagnostic, WorkerConfig};

/// Capacity of the observer and internal event channels.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the channel feeding the writer task.
const WRITER_CHANNEL_CAPACITY: usize = 64;

pub(crate) enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Events flowing from the I/O tasks to the supervisor.
enum WorkerEvent {
    Exited {
        detail: String,
    },
    Diagnostics {
        path: PathBuf,
        items: Vec<SvDiagnostic>,
    },
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>>;

/// The live worker: child process plus the channel endpoints.
struct ActiveWorker {
    /// Absent only for test-constructed workers.
    child: Option<Child>,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: u64,
    pending: PendingMap,
}

impl ActiveWorker {
    async fn request(
        &mut self,
        method: &'static str,
        params: Option<serde_json::Value>,
        timeout: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = protocol::Request::new(id, method, params);
        let frame = serde_json::to_value(&request).context("serializing request")?;
        if self
            .writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            anyhow::bail!("writer channel closed");
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                anyhow::bail!("worker dropped the response channel")
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                anyhow::bail!("{method} request timed out after {timeout:?}")
            }
        }
    }

    async fn notify(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        let notification = protocol::Notification::new(method, params);
        let frame = serde_json::to_value(&notification).context("serializing notification")?;
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .map_err(|_| anyhow::anyhow!("writer channel closed"))
    }

    /// Graceful shutdown: ask politely, then enforce the grace period.
    async fn shutdown(mut self, grace: Duration) {
        if let Ok(response) = self.request("shutdown", None, grace).await
            && response.get("error").is_none()
        {
            let _ = self.notify("exit", None).await;
        }

        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        if let Some(mut child) = self.child.take() {
            if tokio::time::timeout(grace, child.wait()).await.is_err() {
                tracing::debug!("worker did not exit within the grace period; killing");
                let _ = child.kill().await;
            }
        }
    }
}

/// Supervises the single out-of-process analysis worker.
pub struct Supervisor {
    config: WorkerConfig,
    state: LifecycleState,
    /// Bumped on every successful start; lets the sync bridge notice that
    /// a fresh worker has no memory of previously opened documents.
    generation: u64,
    active: Option<ActiveWorker>,
    observer_tx: mpsc::Sender<ClientEvent>,
    worker_tx: mpsc::Sender<WorkerEvent>,
    worker_rx: mpsc::Receiver<WorkerEvent>,
}

impl Supervisor {
    /// Create a supervisor in `Stopped` and hand back the observer channel
    /// on which every state transition is reported.
    #[must_use]
    pub fn new(config: WorkerConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (observer_tx, observer_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (worker_tx, worker_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                config,
                state: LifecycleState::Stopped,
                generation: 0,
                active: None,
                observer_tx,
                worker_tx,
                worker_rx,
            },
            observer_rx,
        )
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Count of successful starts. Changes exactly when a fresh worker
    /// process reaches `Running`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start the worker.
    ///
    /// A call from a non-terminal state is ignored: only one attempt may
    /// be in flight, and a running worker is left alone. A configuration
    /// problem (missing or non-executable program) fails the attempt
    /// without any state transition; a spawn or handshake failure leaves
    /// the supervisor `Stopped`.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        if !self.state.is_terminal() {
            tracing::debug!(
                state = self.state.label(),
                "start ignored; an operation is already in flight"
            );
            return Ok(());
        }

        let program = which::which(&self.config.program).map_err(|e| {
            ClientError::Configuration(format!("{}: {e}", self.config.program.display()))
        })?;

        self.set_state(LifecycleState::Starting);

        let attempt = async {
            let mut active = self.spawn_worker(&program)?;
            self.initialize(&mut active).await?;
            anyhow::Ok(active)
        }
        .await;

        match attempt {
            Ok(active) => {
                self.active = Some(active);
                self.generation += 1;
                self.set_state(LifecycleState::Running);
                tracing::info!(program = %program.display(), "analysis worker running");
                Ok(())
            }
            Err(e) => {
                // The failed child (if any) was dropped inside the attempt
                // and killed via kill_on_drop.
                self.set_state(LifecycleState::Stopped);
                Err(ClientError::StartFailure(format!("{e:#}")))
            }
        }
    }

    /// Request a graceful shutdown of the worker.
    ///
    /// Idempotent: a `Stopped` supervisor stays `Stopped`, and a `Crashed`
    /// one stays `Crashed` (the crash remains visible until the next
    /// successful start).
    pub async fn stop(&mut self) {
        if self.state.is_terminal() {
            tracing::trace!(state = self.state.label(), "stop is a no-op");
            return;
        }

        self.set_state(LifecycleState::Stopping);
        if let Some(active) = self.active.take() {
            active.shutdown(self.config.shutdown_grace).await;
        }
        self.set_state(LifecycleState::Stopped);
    }

    /// `stop` followed by `start` with the retained configuration.
    ///
    /// The stop completes before the start begins, so the old worker has
    /// released the channel before a new one is spawned. Reentrancy is not
    /// possible: the supervisor's single owner cannot issue a second
    /// restart while this one is awaited, and `start` ignores calls from
    /// non-terminal states besides.
    pub async fn restart(&mut self) -> Result<(), ClientError> {
        tracing::info!("restarting analysis worker");
        self.stop().await;
        self.start().await
    }

    /// Send a notification on the active channel.
    ///
    /// Callers are expected to have checked [`Supervisor::state`] first;
    /// an absent channel is reported as [`ClientError::ChannelClosed`].
    pub(crate) async fn send_notification(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let Some(active) = &self.active else {
            return Err(ClientError::ChannelClosed);
        };
        active
            .notify(method, params)
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }

    /// Drain pending I/O-task events, up to `budget`. Non-blocking.
    ///
    /// This is where an unexpected worker exit is detected: an exit
    /// observed while `Running` moves the supervisor to `Crashed` and
    /// emits [`ClientEvent::UnexpectedExit`]. No automatic restart is
    /// attempted; a crash loop should be visible, not masked.
    pub fn process_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.worker_rx.try_recv() {
                Ok(event) => {
                    self.handle_worker_event(event);
                    count += 1;
                }
                Err(_) => break,
            }
        }
        count
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Exited { detail } => {
                if self.state == LifecycleState::Running {
                    tracing::warn!(%detail, "analysis worker exited unexpectedly");
                    self.active = None;
                    self.set_state(LifecycleState::Crashed);
                    self.emit(ClientEvent::UnexpectedExit { detail });
                } else {
                    // Expected during stop, or stale after a failed start.
                    tracing::debug!(state = self.state.label(), %detail, "worker exit observed");
                }
            }
            WorkerEvent::Diagnostics { path, items } => {
                self.emit(ClientEvent::Diagnostics { path, items });
            }
        }
    }

    fn set_state(&mut self, to: LifecycleState) {
        let from = std::mem::replace(&mut self.state, to);
        tracing::debug!(from = from.label(), to = to.label(), "worker state changed");
        self.emit(ClientEvent::StateChanged { from, to });
    }

    fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.observer_tx.try_send(event) {
            tracing::debug!("observer channel unavailable, dropping event: {e}");
        }
    }

    fn spawn_worker(&self, program: &Path) -> anyhow::Result<ActiveWorker> {
        let mut cmd = Command::new(program);
        cmd.args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", program.display()))?;

        let stdout = child.stdout.take().context("worker has no stdout")?;
        let stdin = child.stdin.take().context("worker has no stdin")?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!("worker write error: {e:#}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        tokio::spawn(run_reader(
            stdout,
            pending.clone(),
            writer_tx.clone(),
            self.worker_tx.clone(),
            normalize_path(&self.config.working_dir),
        ));

        Ok(ActiveWorker {
            child: Some(child),
            writer_tx,
            next_id: 1,
            pending,
        })
    }

    async fn initialize(&self, active: &mut ActiveWorker) -> anyhow::Result<()> {
        let root_uri = protocol::path_to_file_uri(&self.config.working_dir)
            .context("converting workspace root to URI")?;

        let response = active
            .request(
                "initialize",
                Some(protocol::initialize_params(root_uri.as_str())),
                self.config.init_timeout,
            )
            .await?;

        if let Some(error) = response.get("error") {
            anyhow::bail!(
                "initialize rejected: {}",
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
            );
        }

        active
            .notify("initialized", Some(serde_json::json!({})))
            .await?;

        Ok(())
    }
}

async fn run_reader(
    stdout: ChildStdout,
    pending: PendingMap,
    writer_tx: mpsc::Sender<WriterCommand>,
    worker_tx: mpsc::Sender<WorkerEvent>,
    workspace_root: PathBuf,
) {
    let mut reader = FrameReader::new(stdout);
    loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => {
                dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, &workspace_root).await;
            }
            Ok(None) => {
                let _ = worker_tx
                    .send(WorkerEvent::Exited {
                        detail: "worker closed its output stream".to_string(),
                    })
                    .await;
                break;
            }
            Err(e) => {
                let _ = worker_tx
                    .send(WorkerEvent::Exited {
                        detail: format!("read error: {e:#}"),
                    })
                    .await;
                break;
            }
        }
    }
}

async fn dispatch_frame(
    frame: &serde_json::Value,
    pending: &Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>,
    writer_tx: &mpsc::Sender<WriterCommand>,
    worker_tx: &mpsc::Sender<WorkerEvent>,
    workspace_root: &Path,
) {
    let Some(incoming) = protocol::classify(frame) else {
        tracing::trace!("dropping malformed frame from worker");
        return;
    };

    match incoming {
        Incoming::Response { id, body } => {
            let sender = pending.lock().await.remove(&id);
            if let Some(tx) = sender {
                let _ = tx.send(body);
            }
        }
        Incoming::WorkerRequest { id, method } => {
            // Answer unsupported requests so the worker never blocks on us.
            tracing::debug!(%method, "worker request unsupported; replying method not found");
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("Method not found: {method}")
                }
            });
            let _ = writer_tx.send(WriterCommand::Send(response)).await;
        }
        Incoming::Notification { method, params } => {
            if method == "textDocument/publishDiagnostics" {
                handle_diagnostics(params, worker_tx, workspace_root).await;
            } else {
                tracing::trace!(%method, "ignoring worker notification");
            }
        }
    }
}

async fn handle_diagnostics(
    params: Option<serde_json::Value>,
    worker_tx: &mpsc::Sender<WorkerEvent>,
    workspace_root: &Path,
) {
    let Some(params) = params else { return };
    let parsed: protocol::PublishDiagnosticsParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!("unparseable publishDiagnostics from worker: {e}");
            return;
        }
    };

    let Some(path) = protocol::file_uri_to_path(&parsed.uri) else {
        return;
    };
    if !normalize_path(&path).starts_with(workspace_root) {
        tracing::warn!(
            path = %path.display(),
            "worker reported diagnostics outside the workspace; dropping"
        );
        return;
    }

    let items = parsed
        .diagnostics
        .iter()
        .map(protocol::RawDiagnostic::to_diagnostic)
        .collect();
    let _ = worker_tx
        .send(WorkerEvent::Diagnostics { path, items })
        .await;
}

/// Resolve `.` and `..` components without touching the file system.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}

#[cfg(test)]
impl Supervisor {
    /// A supervisor wired as `Running` with its writer channel captured,
    /// without any real child process.
    pub(crate) fn test_running() -> (
        Self,
        mpsc::Receiver<WriterCommand>,
        mpsc::Receiver<ClientEvent>,
    ) {
        let (mut sup, events) = Self::new(WorkerConfig::new("true", std::env::temp_dir()));
        let (writer_tx, writer_rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        sup.active = Some(ActiveWorker {
            child: None,
            writer_tx,
            next_id: 1,
            pending: Arc::new(Mutex::new(HashMap::new())),
        });
        sup.state = LifecycleState::Running;
        sup.generation = 1;
        (sup, writer_rx, events)
    }

    pub(crate) fn test_set_state(&mut self, state: LifecycleState) {
        self.state = state;
    }

    pub(crate) fn test_bump_generation(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn test_inject_exit(&self, detail: &str) {
        self.worker_tx
            .try_send(WorkerEvent::Exited {
                detail: detail.to_string(),
            })
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channels() -> (
        PendingMap,
        mpsc::Sender<WriterCommand>,
        mpsc::Receiver<WriterCommand>,
        mpsc::Sender<WorkerEvent>,
        mpsc::Receiver<WorkerEvent>,
    ) {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (writer_tx, writer_rx) = mpsc::channel(32);
        let (worker_tx, worker_rx) = mpsc::channel(32);
        (pending, writer_tx, writer_rx, worker_tx, worker_rx)
    }

    fn expect_state_change(
        events: &mut mpsc::Receiver<ClientEvent>,
        from: LifecycleState,
        to: LifecycleState,
    ) {
        match events.try_recv() {
            Ok(ClientEvent::StateChanged { from: f, to: t }) => {
                assert_eq!((f, t), (from, to));
            }
            other => panic!("expected StateChanged {from:?}->{to:?}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_routes_to_pending_request() {
        let (pending, writer_tx, _writer_rx, worker_tx, _worker_rx) = test_channels();
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert(1, tx);

        let frame = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"capabilities": {}}});
        dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;

        let response = rx.await.unwrap();
        assert!(response["result"]["capabilities"].is_object());
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn response_for_unknown_id_is_dropped() {
        let (pending, writer_tx, _writer_rx, worker_tx, _worker_rx) = test_channels();
        let frame = serde_json::json!({"jsonrpc": "2.0", "id": 404, "result": {}});
        dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;
    }

    #[tokio::test]
    async fn worker_request_gets_method_not_found() {
        let (pending, writer_tx, mut writer_rx, worker_tx, _worker_rx) = test_channels();

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "client/registerCapability",
            "params": {}
        });
        dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;

        match writer_rx.try_recv().unwrap() {
            WriterCommand::Send(response) => {
                assert_eq!(response["id"], 8);
                assert_eq!(response["error"]["code"], -32601);
            }
            WriterCommand::Shutdown => panic!("expected Send, got Shutdown"),
        }
    }

    #[tokio::test]
    async fn diagnostics_inside_workspace_become_events() {
        let (pending, writer_tx, _writer_rx, worker_tx, mut worker_rx) = test_channels();

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": {
                "uri": "file:///work/rtl/top.sv",
                "diagnostics": [{
                    "range": { "start": { "line": 3, "character": 0 }, "end": { "line": 3, "character": 6 } },
                    "severity": 1,
                    "message": "syntax error: 'endmodul'"
                }]
            }
        });
        dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;

        match worker_rx.try_recv().unwrap() {
            WorkerEvent::Diagnostics { path, items } => {
                assert_eq!(path, PathBuf::from("/work/rtl/top.sv"));
                assert_eq!(items.len(), 1);
                assert!(items[0].severity().is_error());
            }
            WorkerEvent::Exited { .. } => panic!("expected Diagnostics"),
        }
    }

    #[tokio::test]
    async fn diagnostics_outside_workspace_are_dropped() {
        let (pending, writer_tx, _writer_rx, worker_tx, mut worker_rx) = test_channels();

        for uri in ["file:///etc/passwd", "file:///work/../etc/passwd"] {
            let frame = serde_json::json!({
                "jsonrpc": "2.0",
                "method": "textDocument/publishDiagnostics",
                "params": {
                    "uri": uri,
                    "diagnostics": [{
                        "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 1 } },
                        "severity": 1,
                        "message": "gotcha"
                    }]
                }
            });
            dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;
        }

        assert!(worker_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_notification_is_ignored() {
        let (pending, writer_tx, mut writer_rx, worker_tx, mut worker_rx) = test_channels();

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "window/logMessage",
            "params": { "type": 3, "message": "hello" }
        });
        dispatch_frame(&frame, &pending, &writer_tx, &worker_tx, Path::new("/work")).await;

        assert!(writer_rx.try_recv().is_err());
        assert!(worker_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn exit_while_running_is_a_crash() {
        let (mut sup, _writer_rx, mut events) = Supervisor::test_running();
        sup.test_inject_exit("worker closed its output stream");

        assert_eq!(sup.process_events(16), 1);
        assert_eq!(sup.state(), LifecycleState::Crashed);

        expect_state_change(&mut events, LifecycleState::Running, LifecycleState::Crashed);
        match events.try_recv() {
            Ok(ClientEvent::UnexpectedExit { detail }) => {
                assert!(detail.contains("closed its output stream"));
            }
            other => panic!("expected UnexpectedExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exit_after_stop_is_not_a_crash() {
        let (mut sup, _writer_rx, mut events) = Supervisor::test_running();
        sup.test_set_state(LifecycleState::Stopped);
        sup.test_inject_exit("worker closed its output stream");

        sup.process_events(16);
        assert_eq!(sup.state(), LifecycleState::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn start_from_running_is_ignored() {
        let (mut sup, _writer_rx, mut events) = Supervisor::test_running();
        sup.start().await.unwrap();

        assert_eq!(sup.state(), LifecycleState::Running);
        assert_eq!(sup.generation(), 1);
        assert!(events.try_recv().is_err(), "no transition may be emitted");
    }

    #[tokio::test]
    async fn missing_program_is_a_configuration_error() {
        let config = WorkerConfig::new("/usr/bin/does-not-exist", std::env::temp_dir());
        let (mut sup, mut events) = Supervisor::new(config);

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
        assert_eq!(sup.state(), LifecycleState::Stopped);
        assert!(events.try_recv().is_err(), "no transition may be emitted");
    }

    #[tokio::test]
    async fn stop_on_fresh_supervisor_is_a_no_op() {
        let (mut sup, mut events) = Supervisor::new(WorkerConfig::new("true", std::env::temp_dir()));
        sup.stop().await;

        assert_eq!(sup.state(), LifecycleState::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn process_events_respects_budget() {
        let (sup, _writer_rx, _events) = Supervisor::test_running();
        for _ in 0..5 {
            sup.worker_tx
                .try_send(WorkerEvent::Diagnostics {
                    path: PathBuf::from("/work/top.sv"),
                    items: vec![],
                })
                .unwrap();
        }
        let mut sup = sup;
        assert_eq!(sup.process_events(3), 3);
        assert_eq!(sup.process_events(16), 2);
        assert_eq!(sup.process_events(16), 0);
    }

    #[test]
    fn normalize_path_resolves_dots() {
        assert_eq!(
            normalize_path(Path::new("/work/./rtl/../top.sv")),
            PathBuf::from("/work/top.sv")
        );
    }
}
