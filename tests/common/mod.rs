//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use quota_gate::authority::{QuotaAuthority, QuotaPolicy};
use quota_gate::config::ServerConfig;
use quota_gate::exchange::HttpTransport;
use quota_gate::http::EchoServer;
use quota_gate::lifecycle::Shutdown;

/// Start an echo server with the given policy on an ephemeral port.
pub async fn start_echo_server(policy: Arc<dyn QuotaPolicy>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = EchoServer::new(ServerConfig::default(), QuotaAuthority::new(policy));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start a backend that answers every request with 200 and the given raw
/// header lines (each terminated by `\r\n`).
#[allow(dead_code)]
pub async fn start_raw_backend(headers: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let body = "raw backend";
                        let response = format!(
                            "HTTP/1.1 200 OK\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            headers,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Plain-HTTP transport pointed at `addr`.
pub fn transport_for(addr: SocketAddr) -> HttpTransport {
    let base = Url::parse(&format!("http://{}", addr)).unwrap();
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    HttpTransport::with_client(client, base)
}
