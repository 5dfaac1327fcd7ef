//! A scripted HTTP server on localhost for client tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub url: Url,
  pub body: String,
  headers: Vec<(String, String)>,
}

impl RecordedRequest {
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// Decoded query parameters, in request order.
  pub fn query(&self) -> Vec<(String, String)> {
    self
      .url
      .query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect()
  }

  pub fn json(&self) -> serde_json::Value {
    serde_json::from_str(&self.body).unwrap()
  }
}

/// Answers each connection with the next scripted `(status, body)` and
/// records what was asked.
pub struct HttpStub {
  pub base_url: String,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl HttpStub {
  pub async fn serve(responses: Vec<(u16, &str)>) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    let responses: Vec<(u16, String)> = responses
      .into_iter()
      .map(|(status, body)| (status, body.to_string()))
      .collect();

    tokio::spawn(async move {
      for (status, body) in responses {
        let Ok((mut socket, _)) = listener.accept().await else {
          return;
        };
        let request = read_request(&mut socket, addr).await;
        recorded.lock().unwrap().push(request);
        let reply = format!(
          "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
          status,
          body.len(),
          body
        );
        let _ = socket.write_all(reply.as_bytes()).await;
        let _ = socket.shutdown().await;
      }
    });

    Self {
      base_url: format!("http://{}", addr),
      requests,
    }
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }
}

/// A client that never routes through a proxy from the environment.
pub fn direct_http() -> reqwest::Client {
  reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn read_request(socket: &mut TcpStream, addr: SocketAddr) -> RecordedRequest {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];
  let header_end = loop {
    let n = socket.read(&mut chunk).await.unwrap();
    assert!(n > 0, "connection closed before the request head");
    buf.extend_from_slice(&chunk[..n]);
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
      break pos + 4;
    }
  };

  let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
  let mut lines = head.split("\r\n");
  let mut request_line = lines.next().unwrap_or_default().split(' ');
  let method = request_line.next().unwrap_or_default().to_string();
  let target = request_line.next().unwrap_or_default().to_string();
  let headers: Vec<(String, String)> = lines
    .filter_map(|line| line.split_once(':'))
    .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
    .collect();

  let length = headers
    .iter()
    .find(|(name, _)| name == "content-length")
    .and_then(|(_, value)| value.parse::<usize>().ok())
    .unwrap_or(0);
  while buf.len() < header_end + length {
    let n = socket.read(&mut chunk).await.unwrap();
    assert!(n > 0, "connection closed before the request body");
    buf.extend_from_slice(&chunk[..n]);
  }

  RecordedRequest {
    method,
    url: Url::parse(&format!("http://{}{}", addr, target)).unwrap(),
    body: String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string(),
    headers,
  }
}
