//! Tiny one-shot HTTP server for exercising the real client in tests.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

/// A request as seen by the server: request line plus lower-cased headers.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response: extra header lines and a body.
pub struct Reply {
    pub status: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(headers: Vec<(&'static str, String)>, body: &[u8]) -> Self {
        Self {
            status: "200 OK",
            headers,
            body: body.to_vec(),
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Serve connections forever on a background thread, answering each with
/// `respond(&request)`. Every response closes its connection.
pub fn serve<F>(respond: F) -> TestServer
where
    F: Fn(&SeenRequest) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_server = Arc::clone(&seen);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
                }
            }

            let request = SeenRequest {
                method,
                path,
                headers,
            };
            let reply = respond(&request);
            seen_server.lock().unwrap().push(request.clone());

            let mut head = format!("HTTP/1.1 {}\r\n", reply.status);
            for (k, v) in &reply.headers {
                head.push_str(&format!("{}: {}\r\n", k, v));
            }
            head.push_str(&format!("Content-Length: {}\r\n", reply.body.len()));
            head.push_str("Connection: close\r\n\r\n");

            let _ = stream.write_all(head.as_bytes());
            if request.method != "HEAD" {
                let _ = stream.write_all(&reply.body);
            }
            let _ = stream.flush();
        }
    });

    TestServer {
        base_url: format!("http://{}", addr),
        seen,
    }
}
