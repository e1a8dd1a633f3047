//! HTTP event-stream transport
//!
//! Streams the idea endpoint with reqwest and decodes it as SSE.

use anyhow::Result;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handle::StreamHandle;
use super::sse::SseDecoder;
use super::transport::{EventStreamTransport, StreamRequest, TransportEvent};
use crate::error::TransportError;

/// Longest error body kept from a failed response
const MAX_ERROR_BODY: usize = 512;

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpEventStream {
    client: reqwest::Client,
    /// Connection is failed if no chunk arrives within this window
    chunk_timeout: Duration,
}

impl HttpEventStream {
    pub fn new(chunk_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ideagen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, chunk_timeout))
    }

    pub fn with_client(client: reqwest::Client, chunk_timeout: Duration) -> Self {
        Self {
            client,
            chunk_timeout,
        }
    }
}

impl EventStreamTransport for HttpEventStream {
    fn connect(
        &self,
        request: StreamRequest,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> StreamHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let client = self.client.clone();
        let chunk_timeout = self.chunk_timeout;

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    debug!("Idea stream cancelled");
                }
                outcome = pump(&client, &request, chunk_timeout, &events) => {
                    if cancelled.is_cancelled() {
                        return;
                    }
                    let event = match outcome {
                        Ok(()) => TransportEvent::Complete,
                        Err(e) => TransportEvent::Error(e),
                    };
                    let _ = events.send(event);
                }
            }
        });

        StreamHandle::new(token, task)
    }
}

/// Drive one connection to its end, forwarding every frame as a fragment
async fn pump(
    client: &reqwest::Client,
    request: &StreamRequest,
    chunk_timeout: Duration,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), TransportError> {
    let mut builder = client.get(request.url.clone());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    info!("Opening idea stream: {}", request.url);
    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        warn!("Idea stream rejected: {} {}", status, body);
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    info!("Idea stream connected: {}", status);

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = match timeout(chunk_timeout, stream.next()).await {
            Ok(Some(Ok(bytes))) => bytes,
            Ok(Some(Err(e))) => return Err(TransportError::Read(e.to_string())),
            Ok(None) => break,
            Err(_) => return Err(TransportError::Timeout(chunk_timeout.as_secs())),
        };

        for frame in decoder.push(&chunk) {
            if events.send(TransportEvent::Fragment(frame.data)).is_err() {
                debug!("Session dropped its receiver; closing stream");
                return Ok(());
            }
        }
    }

    for frame in decoder.finish() {
        let _ = events.send(TransportEvent::Fragment(frame.data));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    /// Serve one raw HTTP response, returning the request head it received
    async fn serve_once(response: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        let url = Url::parse(&format!("http://{}/api", addr)).unwrap();
        (url, task)
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = !matches!(event, TransportEvent::Fragment(_));
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn test_streams_fragments_then_completes() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n\
             data: Idea: \n\ndata: A marketplace \n\ndata: for recycled electronics.\n\n",
        )
        .await;

        let transport = HttpEventStream::new(Duration::from_secs(5)).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = transport.connect(StreamRequest::authenticated(url, "tok"), tx);

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                TransportEvent::Fragment("Idea: ".to_string()),
                TransportEvent::Fragment("A marketplace ".to_string()),
                TransportEvent::Fragment("for recycled electronics.".to_string()),
                TransportEvent::Complete,
            ]
        );

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /api "));
        assert!(head.contains("authorization: bearer tok"));
        assert!(head.contains("accept: text/event-stream"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (url, _server) = serve_once(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 9\r\nconnection: close\r\n\r\nforbidden",
        )
        .await;

        let transport = HttpEventStream::new(Duration::from_secs(5)).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = transport.connect(StreamRequest::authenticated(url, "tok"), tx);

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![TransportEvent::Error(TransportError::Status {
                status: 403,
                body: "forbidden".to_string(),
            })]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_an_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/api", addr)).unwrap();
        let transport = HttpEventStream::new(Duration::from_secs(5)).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = transport.connect(StreamRequest::authenticated(url, "tok"), tx);

        let events = collect(rx).await;
        assert!(matches!(
            events.as_slice(),
            [TransportEvent::Error(TransportError::Connect(_))]
        ));
    }

    #[tokio::test]
    async fn test_stop_prevents_further_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\r\n")
                .await;
            // Hold the connection open without sending anything
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let url = Url::parse(&format!("http://{}/api", addr)).unwrap();
        let transport = HttpEventStream::new(Duration::from_secs(30)).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = transport.connect(StreamRequest::authenticated(url, "tok"), tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();

        // The task is gone, so the sender is dropped without sending anything
        assert_eq!(rx.recv().await, None);
    }
}
