//! Lifecycle tests against a real scripted worker process.
//!
//! The fake worker is a `/bin/sh` script that waits for the first byte of
//! the initialize request, answers the handshake, and then behaves as the
//! individual test needs (consume input, record it, or die).

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use svbridge_client::{
    ChangeRange, ClientError, ClientEvent, LifecycleState, ReportedChange, Supervisor, SyncBridge,
    WorkerConfig,
};
use tokio::sync::mpsc;

/// Script preamble: answer the initialize handshake once the request
/// starts arriving.
fn responder(extra: &str) -> String {
    format!(
        "#!/bin/sh\n\
         dd bs=1 count=1 > /dev/null 2>&1\n\
         body='{{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{{\"capabilities\":{{}}}}}}'\n\
         printf 'Content-Length: %s\\r\\n\\r\\n%s' \"${{#body}}\" \"$body\"\n\
         {extra}\n"
    )
}

fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(script: &Path, dir: &Path) -> WorkerConfig {
    let mut config = WorkerConfig::new(script, dir);
    config.init_timeout = Duration::from_secs(5);
    config.shutdown_grace = Duration::from_millis(300);
    config
}

async fn expect_transition(
    events: &mut mpsc::Receiver<ClientEvent>,
    from: LifecycleState,
    to: LifecycleState,
) {
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a state change")
        .expect("event channel closed");
    match event {
        ClientEvent::StateChanged { from: f, to: t } => assert_eq!((f, t), (from, to)),
        other => panic!("expected StateChanged {from:?}->{to:?}, got {other:?}"),
    }
}

/// Poll `process_events` until the supervisor reaches `target`.
async fn wait_for_state(sup: &mut Supervisor, target: LifecycleState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        sup.process_events(16);
        if sup.state() == target {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "worker never reached {target:?}, still {:?}",
            sup.state()
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn start_walks_stopped_starting_running_and_stop_reverses() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "worker.sh", &responder("cat > /dev/null"));
    let (mut sup, mut events) = Supervisor::new(test_config(&script, dir.path()));

    assert_eq!(sup.state(), LifecycleState::Stopped);
    sup.start().await.unwrap();
    assert_eq!(sup.state(), LifecycleState::Running);
    assert_eq!(sup.generation(), 1);

    expect_transition(&mut events, LifecycleState::Stopped, LifecycleState::Starting).await;
    expect_transition(&mut events, LifecycleState::Starting, LifecycleState::Running).await;

    sup.stop().await;
    assert_eq!(sup.state(), LifecycleState::Stopped);
    expect_transition(&mut events, LifecycleState::Running, LifecycleState::Stopping).await;
    expect_transition(&mut events, LifecycleState::Stopping, LifecycleState::Stopped).await;

    // The worker's exit after a requested stop must not surface as a crash.
    tokio::time::sleep(Duration::from_millis(200)).await;
    sup.process_events(16);
    assert_eq!(sup.state(), LifecycleState::Stopped);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn missing_executable_fails_without_state_transition() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(Path::new("/usr/bin/does-not-exist"), dir.path());
    let (mut sup, mut events) = Supervisor::new(config);

    let err = sup.start().await.unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)), "got {err}");
    assert_eq!(sup.state(), LifecycleState::Stopped);
    assert!(events.try_recv().is_err(), "no transition may be reported");
}

#[tokio::test]
async fn non_executable_program_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("server.py");
    std::fs::write(&script, "print('not executable')\n").unwrap();

    let (mut sup, _events) = Supervisor::new(test_config(&script, dir.path()));
    let err = sup.start().await.unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)), "got {err}");
    assert_eq!(sup.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn start_failure_when_worker_never_answers() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "mute.sh", "#!/bin/sh\ncat > /dev/null\n");
    let mut config = test_config(&script, dir.path());
    config.init_timeout = Duration::from_millis(300);

    let (mut sup, mut events) = Supervisor::new(config);
    let err = sup.start().await.unwrap_err();
    assert!(matches!(err, ClientError::StartFailure(_)), "got {err}");
    assert_eq!(sup.state(), LifecycleState::Stopped);

    expect_transition(&mut events, LifecycleState::Stopped, LifecycleState::Starting).await;
    expect_transition(&mut events, LifecycleState::Starting, LifecycleState::Stopped).await;
}

#[tokio::test]
async fn restart_spawns_exactly_one_fresh_worker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawns.log");
    let script = write_script(
        dir.path(),
        "worker.sh",
        &format!(
            "#!/bin/sh\necho spawned >> \"{}\"\n{}",
            marker.display(),
            responder("cat > /dev/null").trim_start_matches("#!/bin/sh\n"),
        ),
    );

    let (mut sup, _events) = Supervisor::new(test_config(&script, dir.path()));
    sup.start().await.unwrap();
    assert_eq!(spawn_count(&marker), 1);

    // A second start while running must not spawn another worker.
    sup.start().await.unwrap();
    assert_eq!(spawn_count(&marker), 1);
    assert_eq!(sup.generation(), 1);

    sup.restart().await.unwrap();
    assert_eq!(sup.state(), LifecycleState::Running);
    assert_eq!(sup.generation(), 2);
    assert_eq!(spawn_count(&marker), 2);

    sup.stop().await;
}

fn spawn_count(marker: &Path) -> usize {
    std::fs::read_to_string(marker)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn unexpected_exit_surfaces_as_crash_and_restart_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "dying.sh", &responder("sleep 0.3"));
    let (mut sup, mut events) = Supervisor::new(test_config(&script, dir.path()));

    sup.start().await.unwrap();
    expect_transition(&mut events, LifecycleState::Stopped, LifecycleState::Starting).await;
    expect_transition(&mut events, LifecycleState::Starting, LifecycleState::Running).await;

    // The script exits on its own shortly after the handshake.
    wait_for_state(&mut sup, LifecycleState::Crashed).await;

    expect_transition(&mut events, LifecycleState::Running, LifecycleState::Crashed).await;
    match events.try_recv() {
        Ok(ClientEvent::UnexpectedExit { .. }) => {}
        other => panic!("expected UnexpectedExit after the crash transition, got {other:?}"),
    }

    // No automatic respawn: the state stays Crashed until told otherwise.
    tokio::time::sleep(Duration::from_millis(200)).await;
    sup.process_events(16);
    assert_eq!(sup.state(), LifecycleState::Crashed);

    // An explicit restart recovers from Crashed.
    sup.restart().await.unwrap();
    assert_eq!(sup.state(), LifecycleState::Running);
    assert_eq!(sup.generation(), 2);
}

#[tokio::test]
async fn forwarded_notifications_carry_the_full_document() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("received.log");
    let script = write_script(
        dir.path(),
        "recording.sh",
        &responder(&format!("exec cat >> \"{}\"", capture.display())),
    );

    let (mut sup, _events) = Supervisor::new(test_config(&script, dir.path()));
    sup.start().await.unwrap();

    let mut bridge = SyncBridge::new();
    let doc = dir.path().join("foo.sv");

    bridge.document_changed(&sup, &doc, &[], "module a;").await;

    // The editor reports an incremental insertion of "b" at offset 6; the
    // worker must still receive the whole document.
    let edit = ReportedChange {
        range: Some(ChangeRange {
            start_line: 0,
            start_col: 6,
            end_line: 0,
            end_col: 6,
        }),
        text: "b".to_string(),
    };
    bridge
        .document_changed(&sup, &doc, &[edit], "module ab;")
        .await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let received = loop {
        let received = std::fs::read_to_string(&capture).unwrap_or_default();
        if received.contains("module ab;") {
            break received;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "worker never received the change; saw: {received}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    };

    assert!(received.contains("textDocument/didOpen"));
    assert!(received.contains(r#""module a;""#));
    assert!(received.contains("textDocument/didChange"));
    assert!(received.contains(r#""module ab;""#));
    assert!(received.contains(r#""version":2"#));

    sup.stop().await;
}
