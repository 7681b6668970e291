//! End-to-end tests over real sockets.

use plinth::config::ServerConfig;
use plinth::http::parser::find_headers_end;
use plinth::router::{Router, StaticFiles};
use plinth::routes::register_demo_routes;
use plinth::server::Server;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(root: &Path, read_timeout_secs: f64) -> Self {
        let cfg = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            read_timeout_secs,
            ..ServerConfig::default()
        };
        let mut router = Router::new(StaticFiles::new(root, "index.html"));
        register_demo_routes(&mut router);

        let server = Server::bind(&cfg, router).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            stop: Some(tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

struct RawResponse {
    head: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn parse(bytes: Vec<u8>) -> Self {
        let end = find_headers_end(&bytes).expect("response has a header terminator");
        Self {
            head: String::from_utf8(bytes[..end].to_vec()).unwrap(),
            body: bytes[end + 4..].to_vec(),
        }
    }

    fn status(&self) -> u16 {
        self.head.split(' ').nth(1).unwrap().parse().unwrap()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.split("\r\n").skip(1).find_map(|line| {
            let (k, v) = line.split_once(": ")?;
            k.eq_ignore_ascii_case(name).then_some(v)
        })
    }
}

async fn send(addr: SocketAddr, request: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    RawResponse::parse(out)
}

#[tokio::test]
async fn test_status_endpoint_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let resp = send(server.addr, b"GET /api/status HTTP/1.1\r\nHost: test\r\n\r\n").await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.header("connection"), Some("close"));
    assert_eq!(resp.header("content-length").unwrap(), resp.body.len().to_string());
    let json: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(json["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_body_split_across_writes() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"POST /api/echo HTTP/1.1\r\nContent-")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(b"Length: 5\r\n\r\nhe").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(b"llo").await.unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    let resp = RawResponse::parse(out);

    assert_eq!(resp.status(), 200);
    let json: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(json["method"], "POST");
    assert_eq!(json["body"], "hello");

    server.stop().await;
}

#[tokio::test]
async fn test_empty_request_gets_400() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    let resp = RawResponse::parse(out);

    assert_eq!(resp.status(), 400);
    assert!(String::from_utf8_lossy(&resp.body).contains("Malformed request"));

    server.stop().await;
}

#[tokio::test]
async fn test_slow_client_times_out_and_is_still_answered() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 0.2).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"POST /api/echo HTTP/1.1\r\nContent-Length: 100\r\n\r\npartial")
        .await
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    let resp = RawResponse::parse(out);

    assert_eq!(resp.status(), 200);
    let json: Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(json["body"], "partial");

    server.stop().await;
}

#[tokio::test]
async fn test_unsupported_method_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let resp = send(server.addr, b"TRACE / HTTP/1.1\r\n\r\n").await;
    assert_eq!(resp.status(), 405);
    assert!(String::from_utf8_lossy(&resp.body).contains("TRACE"));

    server.stop().await;
}

#[tokio::test]
async fn test_head_over_tcp_has_no_body() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("page.html"), "0123456789").unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let resp = send(server.addr, b"HEAD /page.html HTTP/1.1\r\n\r\n").await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.header("content-length"), Some("10"));
    assert!(resp.body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_connections_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let big_a = "a".repeat(200_000);
    let big_b = "b".repeat(150_000);
    std::fs::write(dir.path().join("a.txt"), &big_a).unwrap();
    std::fs::write(dir.path().join("b.txt"), &big_b).unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    let addr = server.addr;
    let (resp_a, resp_b) = tokio::join!(
        send(addr, b"GET /a.txt HTTP/1.1\r\n\r\n"),
        send(addr, b"GET /b.txt HTTP/1.1\r\n\r\n"),
    );

    assert_eq!(resp_a.status(), 200);
    assert_eq!(resp_b.status(), 200);
    assert_eq!(resp_a.body, big_a.as_bytes());
    assert_eq!(resp_b.body, big_b.as_bytes());
    assert_eq!(resp_a.header("content-type"), Some("text/plain"));

    server.stop().await;
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 5.0).await;

    // Address already in use without SO_REUSEPORT.
    let cfg = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: server.addr.port(),
        ..ServerConfig::default()
    };
    let router = Router::new(StaticFiles::new(dir.path(), "index.html"));
    assert!(Server::bind(&cfg, router).await.is_err());

    server.stop().await;
}
