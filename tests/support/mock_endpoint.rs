//! Minimal HTTP endpoint stub for exercising the real client.
//!
//! Speaks just enough HTTP/1.1 to satisfy reqwest: it serves scripted
//! responses one connection at a time and captures the raw request bytes so
//! tests can assert on the wire format. Connections beyond the scripted set
//! are answered with the last response again.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: Option<&'static str>,
    pub body: String,
}

impl CannedResponse {
    pub fn json(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn html(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            content_type: Some("text/html"),
            body: body.to_string(),
        }
    }

    pub fn ok_json(body: &str) -> Self {
        Self::json(200, "OK", body)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        if let Some(ct) = self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

pub struct MockEndpoint {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockEndpoint {
    /// Bind to a random local port and serve `responses` in order, one per
    /// connection.
    pub async fn start(responses: Vec<CannedResponse>) -> std::io::Result<Self> {
        assert!(!responses.is_empty(), "need at least one canned response");
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = requests.clone();
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut stream, _peer)) = listener.accept().await else {
                    break;
                };
                let response = responses[served.min(responses.len() - 1)].clone();
                served += 1;
                let captured = captured.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    captured.lock().await.push(request);
                    let _ = stream.write_all(&response.to_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(Self { addr, requests })
    }

    /// Endpoint URL the client should post to.
    pub fn url(&self) -> String {
        format!("http://{}/v1/frame-notifications", self.addr)
    }

    /// Raw captured requests (head and body), in arrival order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

/// Read one request: headers, then exactly `Content-Length` body bytes.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(header_end) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..header_end]);
            let content_length = parse_content_length(&head).unwrap_or(0);
            if buf.len() - header_end >= content_length {
                break;
            }
        }
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn parse_content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
