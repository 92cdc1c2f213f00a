// SPDX-License-Identifier: MPL-2.0

//! Shared helpers for integration tests

#![allow(dead_code)]

use scan_japan::backends::camera::{CameraFrame, CameraManager};
use scan_japan::backends::virtual_camera::{VirtualBackend, VirtualDevice};
use scan_japan::scanner::{DecodeError, SymbolDecoder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request as the responder received it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path including any query string
    pub target: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Loopback HTTP server answering every request with one canned response
pub struct Responder {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Responder {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let body = body.to_string();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let recorded = Arc::clone(&recorded);
                let body = body.clone();
                tokio::spawn(async move {
                    serve(socket, status, &body, &recorded).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one request, record it, then answer
async fn serve(
    mut socket: TcpStream,
    status: u16,
    body: &str,
    recorded: &Mutex<Vec<Recorded>>,
) -> Option<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let header = |name: &str| {
        head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    };
    let content_length: usize = header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    let chunked = header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

    let mut request_body = buf[header_end..].to_vec();
    loop {
        let complete = if chunked {
            request_body.ends_with(b"0\r\n\r\n")
        } else {
            request_body.len() >= content_length
        };
        if complete {
            break;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        request_body.extend_from_slice(&chunk[..n]);
    }

    recorded.lock().unwrap().push(Recorded {
        method,
        target,
        body: request_body,
    });

    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await.ok()?;
    socket.shutdown().await.ok()
}

/// Decoder that reports the same text for every frame and counts its calls
#[derive(Default)]
pub struct FixedDecoder {
    pub text: String,
    pub calls: AtomicUsize,
}

impl FixedDecoder {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SymbolDecoder for FixedDecoder {
    fn decode(&self, _frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.text.clone()))
    }
}

/// Decoder that fails on the first `failures` frames, then reports `text`
pub struct FlakyDecoder {
    pub text: String,
    pub failures: usize,
    pub calls: AtomicUsize,
}

impl FlakyDecoder {
    pub fn new(text: &str, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SymbolDecoder for FlakyDecoder {
    fn decode(&self, _frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(DecodeError::UnreadableFrame);
        }
        Ok(Some(self.text.clone()))
    }
}

/// Decoder that never finds anything
pub struct BlindDecoder;

impl SymbolDecoder for BlindDecoder {
    fn decode(&self, _frame: &CameraFrame) -> Result<Option<String>, DecodeError> {
        Ok(None)
    }
}

/// Front and back virtual cameras, in that enumeration order
pub fn two_cameras() -> (CameraManager, VirtualBackend) {
    let backend = VirtualBackend::new(vec![
        VirtualDevice::solid("front", "Front Camera", [200, 10, 10]),
        VirtualDevice::solid("back", "Back Camera", [10, 10, 200]),
    ]);
    (CameraManager::new(Arc::new(backend.clone())), backend)
}

/// Poll `condition` until it holds or two seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
