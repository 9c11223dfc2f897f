//! End-to-end session against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `InformaticsClient`
//! with the real `UreqTransport`: login handshake, cookie-carried session,
//! multipart submission and every typed endpoint, including the backend's
//! quirky responses.

use informatics_core::{
    ApiError, ClientConfig, InformaticsClient, Payload, RunsFilter, TransportErrorKind,
};

fn start_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: std::net::SocketAddr) -> InformaticsClient {
    InformaticsClient::new(ClientConfig::default().with_origin(&format!("http://{addr}/")))
}

#[test]
fn judge_session_lifecycle() {
    let addr = start_server();
    let client = client(addr);

    // Step 1: nothing is sent before login.
    let err = client.get_run_source(1).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    // Step 2: wrong password is a plain `false`.
    assert!(!client.login(mock_server::USERNAME, "wrong").unwrap());
    assert!(client.user().is_none());

    // Step 3: real login.
    assert!(client
        .login(mock_server::USERNAME, mock_server::PASSWORD)
        .unwrap());
    assert_eq!(client.user().unwrap().id, mock_server::USER_ID);

    // Step 4: backend rejects an empty file through the envelope.
    let rejected = client.submit_source(3443, "main.py", Vec::new(), 27).unwrap();
    assert!(!rejected.success());
    assert_eq!(rejected.reason(), "Empty file");

    // Step 5: submit from disk; the backend answers `result`, not `status`.
    let path = std::env::temp_dir().join(format!("informatics-{}.py", std::process::id()));
    std::fs::write(&path, "print(1)").unwrap();
    let submitted = client.submit_problem(3443, &path, 27).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(submitted.success());
    assert_eq!(submitted.payload, Payload::Absent);

    // Step 6: own runs.
    let runs = client
        .get_self_runs(3443, &RunsFilter::default())
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].language_id, 27);
    let run_id = runs[0].id;

    // Step 7: source.
    let source = client.get_run_source(run_id).unwrap().into_data().unwrap();
    assert_eq!(source.source, "print(1)");
    assert_eq!(source.lang_id, 27);

    // Step 8: protocol has no status key; success comes from HTTP 200.
    let protocol = client.get_protocol(run_id).unwrap();
    assert!(protocol.success());
    let tests = protocol.into_data().unwrap();
    assert_eq!(tests.len(), mock_server::TEST_COUNT);
    assert_eq!(tests[0].number, "1");

    // Step 9: unknown run; JSON error for source, HTML 404 for protocol.
    let missing = client.get_run_source(999).unwrap();
    assert!(!missing.success());
    assert_eq!(missing.reason(), "Run not found");

    let missing = client.get_protocol(999).unwrap();
    assert!(!missing.success());
    assert_eq!(missing.reason(), "Failed to parse");
    assert_eq!(missing.envelope.status_code, 404);

    // Step 10: reads may run in parallel on one session.
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| client.get_run_source(run_id).unwrap().success()))
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

#[test]
fn unreachable_site_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client(addr).login("a", "b").unwrap_err();
    match err {
        ApiError::Transport(e) => assert_ne!(e.kind, TransportErrorKind::Timeout),
        other => panic!("expected transport error, got {other:?}"),
    }
}
