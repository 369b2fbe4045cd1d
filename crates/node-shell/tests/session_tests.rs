//! Integration tests for the session engine against the mock transport.
//!
//! These tests require the `mock` feature to be enabled.

#![cfg(feature = "mock")]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use node_shell::mock::{MockCall, MockTransport, Scenario, shell_mock};
use node_shell::{
    Credentials, DeploymentConfig, EchoSink, Expectation, LineEnding, ScanMode, SendOptions,
    Session, SessionState, ShellError,
};
use tokio::time::Instant;

const PROMPT: &str = "slicify@slicify:~";

fn node_config(mock: &MockTransport) -> DeploymentConfig {
    DeploymentConfig::default().fingerprint(mock.fingerprint())
}

fn creds() -> Credentials {
    Credentials::new("slicify", "one-time-pw")
}

async fn connected(mock: &MockTransport) -> Session<MockTransport> {
    connected_with(mock, node_config(mock)).await
}

async fn connected_with(mock: &MockTransport, config: DeploymentConfig) -> Session<MockTransport> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut session = Session::new(mock.clone(), config);
    session.connect(&creds()).await.unwrap();
    session
}

fn count(calls: &[MockCall], wanted: &MockCall) -> usize {
    calls.iter().filter(|c| *c == wanted).count()
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// connect
// ============================================================================

#[tokio::test]
async fn connect_returns_greeting_ending_with_prompt() {
    let mock = MockTransport::new().with_banner(format!("Welcome to the node\r\n{PROMPT}"));
    let mut session = Session::new(mock.clone(), node_config(&mock));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());

    let greeting = session.connect(&creds()).await.unwrap();

    assert!(greeting.ends_with(PROMPT.as_bytes()));
    assert!(greeting.contains("Welcome to the node"));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_connected());
}

#[tokio::test]
async fn connect_steps_happen_in_order() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let config = node_config(&mock);
    let pin = config.fingerprint;
    let _session = connected_with(&mock, config).await;

    assert_eq!(
        mock.calls(),
        vec![
            MockCall::Connect {
                target: node_shell::Target::new("www.slicify.com", 22),
                pin,
            },
            MockCall::Authenticate {
                username: "slicify".to_string(),
            },
            MockCall::OpenShell,
        ]
    );
}

#[tokio::test]
async fn pinned_key_mismatch_never_authenticates() {
    let mock = MockTransport::new().with_banner(PROMPT);
    // Default config pins the production node, which the mock is not.
    let mut session = Session::new(mock.clone(), DeploymentConfig::default());

    let err = session.connect(&creds()).await.unwrap_err();

    assert!(matches!(err, ShellError::HostKeyMismatch { .. }));
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Terminal);
    assert!(!session.is_connected());
    let calls = mock.calls();
    assert!(!calls.iter().any(|c| matches!(c, MockCall::Authenticate { .. })));
    assert!(!calls.contains(&MockCall::OpenShell));
}

#[tokio::test]
async fn returned_host_key_is_verified_again() {
    // The transport lets any key through; the session must still refuse it.
    let mock = MockTransport::new().with_banner(PROMPT).without_pin_check();
    let mut session = Session::new(mock.clone(), DeploymentConfig::default());

    let err = session.connect(&creds()).await.unwrap_err();

    match err {
        ShellError::HostKeyMismatch {
            host,
            expected,
            presented,
        } => {
            assert_eq!(host, "www.slicify.com");
            assert_eq!(expected, "e9:5d:51:34:ec:8d:96:6d:1f:70:94:a3:ad:ef:0e:09");
            assert_ne!(presented, expected);
        }
        other => panic!("unexpected error: {other}"),
    }
    let calls = mock.calls();
    assert!(!calls.iter().any(|c| matches!(c, MockCall::Authenticate { .. })));
    assert_eq!(count(&calls, &MockCall::Close), 1);
}

#[tokio::test]
async fn rejected_password_is_terminal() {
    let mock = MockTransport::new().with_banner(PROMPT).fail_auth("denied");
    let mut session = Session::new(mock.clone(), node_config(&mock));

    let err = session.connect(&creds()).await.unwrap_err();

    assert!(matches!(err, ShellError::Authentication { ref user, .. } if user == "slicify"));
    assert_eq!(session.state(), SessionState::Terminal);
    assert!(!mock.calls().contains(&MockCall::OpenShell));

    // A terminal session cannot be reused.
    let again = session.connect(&creds()).await.unwrap_err();
    assert!(matches!(again, ShellError::InvalidState { operation: "connect", .. }));
}

#[tokio::test]
async fn unreachable_node_is_connection_error() {
    let mock = MockTransport::new().fail_connect("connection refused");
    let mut session = Session::new(mock.clone(), node_config(&mock));

    let err = session.connect(&creds()).await.unwrap_err();

    assert!(matches!(err, ShellError::Connection { port: 22, .. }));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(session.state(), SessionState::Terminal);
}

#[tokio::test]
async fn connect_twice_is_rejected() {
    let mock = shell_mock(PROMPT);
    let mut session = connected(&mock).await;

    let err = session.connect(&creds()).await.unwrap_err();

    assert!(matches!(err, ShellError::InvalidState { .. }));
    assert!(err.to_string().contains("ready"));
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn greeting_timeout_leaves_session_ready() {
    let mock = MockTransport::new().with_banner("Welcome, still booting...");
    let mut session = Session::new(mock.clone(), node_config(&mock));

    let err = session
        .connect_with_timeout(&creds(), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.transcript().unwrap().contains("still booting"));
    assert_eq!(session.state(), SessionState::Ready);
    session.disconnect().await.unwrap();
    assert_eq!(session.state(), SessionState::Terminal);
}

#[tokio::test]
async fn slicify_scenario_round_trip() {
    let mock = Scenario::slicify_node().to_transport();
    let mut session = connected(&mock).await;

    let out = session.send("pwd").await.unwrap();

    assert!(out.contains("pwd\n"));
    assert!(out.contains("/home/slicify"));
    assert!(out.ends_with(PROMPT.as_bytes()));
    assert_eq!(mock.written_str(), "pwd\n");
}

// ============================================================================
// send
// ============================================================================

#[tokio::test]
async fn send_returns_output_through_prompt() {
    let mock = MockTransport::new()
        .with_banner(PROMPT)
        .respond("pwd", format!("/home/slicify\r\n{PROMPT}"));
    let mut session = connected(&mock).await;

    let out = session.send("pwd").await.unwrap();

    assert_eq!(out.as_bytes(), format!("/home/slicify\r\n{PROMPT}").as_bytes());
    assert_eq!(mock.written(), b"pwd\n");
    assert!(mock.calls().contains(&MockCall::Flush));
}

#[tokio::test]
async fn send_uses_configured_line_ending() {
    let mock = MockTransport::new().with_banner(PROMPT).respond("ls", PROMPT);
    let config = node_config(&mock).line_ending(LineEnding::CrLf);
    let mut session = connected_with(&mock, config).await;

    session.send("ls").await.unwrap();

    assert_eq!(mock.written(), b"ls\r\n");
}

#[tokio::test]
async fn send_without_expectation_returns_immediately() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;

    let none = session
        .send_with("sleep 600 &", SendOptions::new().no_expect())
        .await
        .unwrap();
    assert!(none.is_none());

    let empty = session
        .send_with("true", SendOptions::new().expect(""))
        .await
        .unwrap();
    assert!(empty.is_none());

    assert_eq!(mock.written_str(), "sleep 600 &\ntrue\n");
}

#[tokio::test]
async fn send_with_custom_literal_and_no_line_ending() {
    let mock = MockTransport::new()
        .with_banner(PROMPT)
        .respond("y", "Proceeding...\r\nDONE\r\n");
    let mut session = connected(&mock).await;

    let out = session
        .send_with("y", SendOptions::new().no_line_ending().expect("DONE"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(out.to_string(), "Proceeding...\r\nDONE");
    assert_eq!(mock.written(), b"y");
}

#[tokio::test]
async fn unbuffered_send_returns_empty_transcript() {
    let mock = MockTransport::new()
        .with_banner(PROMPT)
        .respond("make", format!("lots of output\r\n{PROMPT}"));
    let mut session = connected(&mock).await;

    let out = session
        .send_with("make", SendOptions::new().buffered(false))
        .await
        .unwrap()
        .unwrap();

    assert!(out.is_empty());
    assert_eq!(mock.pending_output(), 0);
}

#[tokio::test]
async fn send_raw_writes_verbatim() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;

    session.send_raw(b"\x03").await.unwrap();

    assert_eq!(mock.written(), b"\x03");
}

#[tokio::test]
async fn failed_write_is_connection_loss() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.set_write_error(Some("broken pipe".to_string()));

    let err = session.send("ls").await.unwrap_err();

    assert!(err.is_connection_lost());
    assert_eq!(session.state(), SessionState::Terminal);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn operations_before_connect_are_rejected() {
    let mock = MockTransport::new();
    let mut session = Session::new(mock.clone(), node_config(&mock));

    assert!(matches!(session.send("ls").await, Err(ShellError::NotConnected)));
    assert!(matches!(session.send_raw(b"x").await, Err(ShellError::NotConnected)));
    assert!(matches!(session.expect_prompt().await, Err(ShellError::NotConnected)));
    assert!(mock.calls().is_empty());
}

// ============================================================================
// expect
// ============================================================================

#[tokio::test]
async fn empty_literal_rejected_before_io() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("data");

    let err = session.expect(Expectation::new("")).await.unwrap_err();

    assert!(matches!(err, ShellError::EmptyLiteral));
    assert_eq!(mock.pending_output(), 4);
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn unbounded_wait_never_returns_early() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;

    let pusher = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        pusher.push_output("job finished\r\nDONE");
    });

    let start = Instant::now();
    let out = session
        .expect(Expectation::new("DONE").unbounded())
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(120));
    assert_eq!(out.to_string(), "job finished\r\nDONE");
}

#[tokio::test(start_paused = true)]
async fn zero_default_timeout_waits_for_match() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let config = node_config(&mock).expect_timeout(Duration::ZERO);
    let mut session = connected_with(&mock, config).await;

    let pusher = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(45)).await;
        pusher.push_output(PROMPT);
    });

    let start = Instant::now();
    session.expect_prompt().await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(45));
}

#[tokio::test(start_paused = true)]
async fn bounded_wait_times_out_and_stays_ready() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("partial");

    let start = Instant::now();
    let err = session
        .expect(Expectation::new("NEVER").timeout(Duration::from_secs(2)))
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(2));
    match &err {
        ShellError::Timeout {
            duration,
            literal,
            transcript,
        } => {
            assert_eq!(*duration, Duration::from_secs(2));
            assert_eq!(literal, "NEVER");
            assert_eq!(transcript.as_bytes(), b"partial");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_fatal());
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_connected());

    // is_connected mirrors the transport.
    mock.drop_connection();
    assert!(!session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn unbuffered_timeout_has_empty_transcript() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("partial");

    let err = session
        .expect(
            Expectation::new("NEVER")
                .buffered(false)
                .timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.transcript().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dead_connection_ends_wait_with_partial_output() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("partial out");

    let dropper = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        dropper.drop_connection();
    });

    let err = session
        .expect(Expectation::new("NEVER").unbounded())
        .await
        .unwrap_err();

    assert!(err.is_connection_lost());
    assert_eq!(err.transcript().unwrap().as_bytes(), b"partial out");
    assert_eq!(session.state(), SessionState::Terminal);
    assert!(!session.is_connected());
    assert!(matches!(session.send("ls").await, Err(ShellError::NotConnected)));
}

#[tokio::test]
async fn end_of_stream_is_connection_loss() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("logout\r\n");
    mock.close_stream();

    let err = session.expect_prompt().await.unwrap_err();

    assert!(err.is_connection_lost());
    assert!(err.to_string().contains("end of stream"));
    assert_eq!(err.transcript().unwrap().to_string(), "logout\r\n");
    assert_eq!(count(&mock.calls(), &MockCall::Close), 1);
}

#[tokio::test]
async fn read_error_is_connection_loss() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.fail_next_read("connection reset by peer");

    let err = session.expect_prompt().await.unwrap_err();

    assert!(err.is_connection_lost());
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(session.state(), SessionState::Terminal);
}

#[tokio::test(start_paused = true)]
async fn naive_scanner_is_the_default() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("aaab");

    let err = session
        .expect(Expectation::new("aab").timeout(Duration::from_secs(1)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.transcript().unwrap().as_bytes(), b"aaab");
}

#[tokio::test]
async fn overlapping_scan_mode_realigns() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let config = node_config(&mock).scan_mode(ScanMode::Overlapping);
    let mut session = connected_with(&mock, config).await;
    mock.push_output("aaab");

    let out = session.expect(Expectation::new("aab")).await.unwrap();

    assert_eq!(out.as_bytes(), b"aaab");
}

#[tokio::test]
async fn expect_stops_at_first_match() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.push_output("one\r\nMARK two\r\nMARK");

    let first = session.expect(Expectation::new("MARK")).await.unwrap();
    assert_eq!(first.to_string(), "one\r\nMARK");
    let second = session.expect(Expectation::new("MARK")).await.unwrap();
    assert_eq!(second.to_string(), " two\r\nMARK");
}

// ============================================================================
// echo
// ============================================================================

#[tokio::test]
async fn echo_mirrors_consumed_bytes_even_unbuffered() {
    let mock = MockTransport::new()
        .with_banner(PROMPT)
        .respond("uptime", format!("up 3 days\r\n{PROMPT}"));
    let mut session = connected(&mock).await;
    assert!(!session.is_echo_enabled());

    let buf = SharedBuf::default();
    session.set_echo(EchoSink::new(buf.clone()));
    assert!(session.is_echo_enabled());

    let out = session
        .send_with("uptime", SendOptions::new().buffered(false))
        .await
        .unwrap()
        .unwrap();

    assert!(out.is_empty());
    assert_eq!(
        buf.0.lock().unwrap().as_slice(),
        format!("up 3 days\r\n{PROMPT}").as_bytes()
    );

    session.disable_echo();
    assert!(!session.is_echo_enabled());
}

// ============================================================================
// disconnect
// ============================================================================

#[tokio::test]
async fn disconnect_twice_is_fine() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;

    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Terminal);
    assert!(!session.is_connected());
    let calls = mock.calls();
    assert_eq!(count(&calls, &MockCall::CloseChannel), 1);
    assert_eq!(count(&calls, &MockCall::Close), 1);
}

#[tokio::test]
async fn disconnect_before_connect_is_noop() {
    let mock = MockTransport::new();
    let mut session = Session::new(mock.clone(), node_config(&mock));

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn disconnect_after_loss_is_noop() {
    let mock = MockTransport::new().with_banner(PROMPT);
    let mut session = connected(&mock).await;
    mock.close_stream();
    assert!(session.expect_prompt().await.is_err());

    session.disconnect().await.unwrap();

    assert_eq!(count(&mock.calls(), &MockCall::Close), 1);
}
