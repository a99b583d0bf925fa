#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carto_sql::{Client, ClientConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const API_KEY: &str = "test-key";

/// How the server answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A complete response with a JSON (or any text) body.
    Json(u16, String),
    /// Close the connection without answering.
    Drop,
    /// Headers promising more body than is sent, then close.
    Partial(String),
    /// Wait, then answer.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self::Json(200, String::from(body))
    }

    pub fn rows(body: &str) -> Self {
        Self::Json(200, format!(r#"{{"rows":{body},"total_rows":0}}"#))
    }

    pub fn empty() -> Self {
        Self::rows("[]")
    }

    pub fn delayed(ms: u64, reply: Self) -> Self {
        Self::Delayed(Duration::from_millis(ms), Box::new(reply))
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub body: String,
}

impl Request {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> HashMap<String, String> {
        let query = self.target.split_once('?').map_or("", |(_, q)| q);
        url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    pub fn form(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }

    /// The `q` field of a SQL endpoint request.
    pub fn sql(&self) -> String {
        self.form().remove("q").unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Responder = dyn Fn(usize, &Request) -> Reply + Send + Sync;

#[derive(Default)]
struct Stats {
    requests: Vec<Request>,
    active: usize,
    max_active: usize,
}

/// Local HTTP/1.1 server answering from a script or a closure.
pub struct MockServer {
    addr: SocketAddr,
    stats: Arc<Mutex<Stats>>,
}

impl MockServer {
    /// Answers request `n` with `responder(n, request)`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(usize, &Request) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(Mutex::new(Stats::default()));
        let responder: Arc<Responder> = Arc::new(responder);

        let server_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let stats = Arc::clone(&server_stats);
                let responder = Arc::clone(&responder);
                tokio::spawn(handle(socket, stats, responder));
            }
        });

        Self { addr, stats }
    }

    /// Answers requests with `replies` in order, then with HTTP 500.
    pub async fn scripted(replies: Vec<Reply>) -> Self {
        let script = Mutex::new(VecDeque::from(replies));
        Self::start(move |_, _| {
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::Json(500, String::from("script exhausted")))
        })
        .await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v2", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url(), API_KEY).with_poll_interval(Duration::from_millis(1))
    }

    /// A client that opens a fresh connection per request.
    pub fn client(&self) -> Client {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap();
        Client::with_http(self.config(), http)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.stats.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.stats.lock().unwrap().requests.len()
    }

    /// Most requests ever being answered at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.stats.lock().unwrap().max_active
    }
}

async fn handle(mut socket: TcpStream, stats: Arc<Mutex<Stats>>, responder: Arc<Responder>) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let index = {
        let mut stats = stats.lock().unwrap();
        stats.requests.push(request.clone());
        stats.active += 1;
        stats.max_active = stats.max_active.max(stats.active);
        stats.requests.len() - 1
    };

    let mut reply = responder(index, &request);
    while let Reply::Delayed(delay, inner) = reply {
        tokio::time::sleep(delay).await;
        reply = *inner;
    }

    stats.lock().unwrap().active -= 1;
    match reply {
        Reply::Json(status, body) => {
            let head = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
        }
        Reply::Partial(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len() + 1024
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
        }
        Reply::Drop | Reply::Delayed(..) => {}
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();
    Some(Request {
        method,
        target,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
