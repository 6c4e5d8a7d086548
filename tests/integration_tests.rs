//! Process lifecycle tests over a real TCP listener.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use html2pdf_server::ContentSource;
use html2pdf_server::engine::mock::{self, MockEngineFactory};
use html2pdf_server::lifecycle::{self, LifecycleError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Send one HTTP/1.1 request and read the whole response.
async fn http_request(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n",
        method, path, addr
    );
    if let Some(body) = body {
        request.push_str("Content-Type: application/json\r\n");
        request.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    } else {
        request.push_str("\r\n");
    }
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Verifies nothing is served when the first launch fails.
#[tokio::test]
async fn test_initial_launch_failure_is_fatal() {
    let factory = MockEngineFactory::always_fails("chrome not found");
    let probe = factory.probe();

    let result = lifecycle::run_until(
        common::server_config(),
        Box::new(factory),
        std::future::pending::<()>(),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, LifecycleError::Launch(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(probe.launch_attempts(), 1);
    assert_eq!(probe.launches(), 0);
}

#[tokio::test]
async fn test_bind_failure_closes_engine() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let factory = MockEngineFactory::new();
    let probe = factory.probe();

    let mut config = common::server_config();
    config.port = port;

    let result = lifecycle::run_until(config, Box::new(factory), std::future::pending::<()>()).await;

    assert!(matches!(result, Err(LifecycleError::Bind { .. })));
    assert_eq!(probe.launches(), 1);
    assert_eq!(probe.engines_closed(), 1);
}

/// Verifies an idle server shuts down cleanly and closes the engine.
#[tokio::test]
async fn test_shutdown_with_no_requests() {
    let factory = MockEngineFactory::new();
    let probe = factory.probe();
    let handle = common::launched_handle(factory).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let config = common::server_config();

    let server = tokio::spawn({
        let handle = handle.clone();
        async move {
            lifecycle::serve(listener, handle, &config, async move {
                rx.await.ok();
            })
            .await
        }
    });

    tx.send(()).unwrap();
    let result = server.await.unwrap();

    assert!(result.is_ok());
    assert_eq!(probe.engines_closed(), 1);
    assert!(handle.is_shutting_down());
    assert!(handle.current().is_none());
}

#[tokio::test]
async fn test_sample_document_over_tcp() {
    let factory = MockEngineFactory::new();
    let probe = factory.probe();
    let handle = common::launched_handle(factory).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let config = common::server_config();

    let server = tokio::spawn(async move {
        lifecycle::serve(listener, handle, &config, async move {
            rx.await.ok();
        })
        .await
    });

    let response = http_request(addr, "GET", "/generate-pdf", None).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("content-type: application/pdf"));
    assert!(response.contains("attachment; filename=\"documento_gerado.pdf\""));
    assert!(response.contains("%PDF-"));

    let source = probe.last_source().unwrap();
    assert!(matches!(source, ContentSource::Html(_)));

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert_eq!(probe.sessions_opened(), probe.sessions_closed());
}

/// Verifies a request in flight when shutdown starts still completes, and
/// the engine closes only afterwards.
#[tokio::test]
async fn test_shutdown_drains_in_flight_request() {
    let factory = MockEngineFactory::new();
    let probe = factory.probe();
    let handle = common::launched_handle(factory).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let config = common::server_config();

    let server = tokio::spawn({
        let handle = handle.clone();
        async move {
            lifecycle::serve(listener, handle, &config, async move {
                rx.await.ok();
            })
            .await
        }
    });

    let body = format!(r#"{{"html":"<p>{}</p>"}}"#, mock::SLOW_LOAD_MARKER);
    let client =
        tokio::spawn(async move { http_request(addr, "POST", "/generate-pdf", Some(&body)).await });

    // Let the request reach the engine before signalling.
    tokio::time::sleep(mock::SLOW_LOAD_DELAY / 3).await;
    assert_eq!(probe.sessions_opened(), 1);
    assert_eq!(probe.engines_closed(), 0);
    tx.send(()).unwrap();

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("%PDF-"));

    server.await.unwrap().unwrap();
    assert_eq!(probe.sessions_closed(), 1);
    assert_eq!(probe.engines_closed(), 1);

    let stats = handle.stats();
    assert!(stats.is_balanced());
    assert!(!stats.installed);
}

#[tokio::test]
async fn test_wait_between_requests_keeps_engine() {
    let factory = MockEngineFactory::new();
    let probe = factory.probe();
    let handle = common::launched_handle(factory).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let config = common::server_config();

    let server = tokio::spawn(async move {
        lifecycle::serve(listener, handle, &config, async move {
            rx.await.ok();
        })
        .await
    });

    for _ in 0..3 {
        let response = http_request(addr, "GET", "/generate-pdf", None).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(probe.launches(), 1);
    assert_eq!(probe.renders(), 3);
}
