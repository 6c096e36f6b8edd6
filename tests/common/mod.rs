//! Loopback HTTP server for integration tests.
//!
//! Routes:
//! - `/echo`: 200, body is the raw request (head and body)
//! - `/bytes/N`: 200, N bytes of a repeating alphabet
//! - `/stream`: 200, chunked body `abc`, `de`, `fgh` with pauses between
//! - `/status/N`: status N, empty body
//! - anything else: 404

#![allow(dead_code)]

use curlnet::easy::TransferHandle;
use curlnet::sys;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

pub const STREAM_CHUNKS: [&str; 3] = ["abc", "de", "fgh"];

pub struct TestServer {
    addr: SocketAddr,
    _runtime: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        runtime.spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket));
            }
        });
        Self {
            addr,
            _runtime: runtime,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// A handle that never goes through a proxy.
pub fn handle_for(url: &str) -> TransferHandle {
    let mut handle = TransferHandle::new().unwrap();
    handle.set_url(url).unwrap();
    handle.set_string(sys::CURLOPT_NOPROXY, "*").unwrap();
    handle
}

pub fn alphabet(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

struct Request {
    path: String,
    head: Vec<u8>,
    body: Vec<u8>,
}

async fn serve(mut socket: TcpStream) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let path = request.path.clone();

    if path == "/stream" {
        let _ = stream_response(&mut socket).await;
    } else if path == "/echo" {
        let mut body = request.head;
        body.extend_from_slice(&request.body);
        let _ = respond(&mut socket, 200, "OK", &body).await;
    } else if let Some(n) = path.strip_prefix("/bytes/") {
        let len = n.parse().unwrap_or(0);
        let _ = respond(&mut socket, 200, "OK", &alphabet(len)).await;
    } else if let Some(code) = path.strip_prefix("/status/") {
        let code = code.parse().unwrap_or(500);
        let _ = respond(&mut socket, code, "Status", b"").await;
    } else {
        let _ = respond(&mut socket, 404, "Not Found", b"not found").await;
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = buf[..head_end].to_vec();
    let text = String::from_utf8_lossy(&head).to_string();
    let path = text.split_whitespace().nth(1)?.to_string();
    let header = |name: &str| {
        text.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    };

    if header("expect").is_some_and(|v| v.eq_ignore_ascii_case("100-continue")) {
        socket.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.ok()?;
    }

    let mut body = buf[head_end..].to_vec();
    if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        while find(&body, b"0\r\n\r\n").is_none() {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }

    Some(Request { path, head, body })
}

async fn respond(
    socket: &mut TcpStream,
    code: u16,
    reason: &str,
    body: &[u8],
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nX-Server: curlnet-test\r\nConnection: close\r\n\r\n",
        code,
        reason,
        body.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body).await?;
    socket.flush().await
}

async fn stream_response(socket: &mut TcpStream) -> std::io::Result<()> {
    socket
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .await?;
    socket.flush().await?;
    for chunk in STREAM_CHUNKS {
        tokio::time::sleep(Duration::from_millis(50)).await;
        socket
            .write_all(format!("{:x}\r\n{}\r\n", chunk.len(), chunk).as_bytes())
            .await?;
        socket.flush().await?;
    }
    socket.write_all(b"0\r\n\r\n").await?;
    socket.flush().await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
