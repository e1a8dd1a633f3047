//! Event-stream transport seam
//!
//! A transport opens one server-push connection and reports what happens on
//! it through a channel. The channel serializes delivery, so the session
//! never sees two events at once.

use tokio::sync::mpsc;
use url::Url;

use super::handle::StreamHandle;
use crate::error::TransportError;

/// What a transport reports about its connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Payload of one server event, treated as opaque text
    Fragment(String),
    /// Connection failed; no further events follow
    Error(TransportError),
    /// Server closed the stream normally
    Complete,
}

/// A single authenticated GET with no body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl StreamRequest {
    /// Request carrying the bearer credential
    pub fn authenticated(url: Url, token: &str) -> Self {
        Self {
            url,
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", token)),
                ("Accept".to_string(), "text/event-stream".to_string()),
            ],
        }
    }

    /// Look up a header value (case-insensitive name)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Opens server-push connections
pub trait EventStreamTransport: Send + Sync {
    /// Start the connection. Events go to `events` until the returned handle
    /// is stopped or the connection ends.
    fn connect(
        &self,
        request: StreamRequest,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> StreamHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_request_headers() {
        let url = Url::parse("http://localhost:8000/api").unwrap();
        let request = StreamRequest::authenticated(url, "abc.def");
        assert_eq!(request.header("authorization"), Some("Bearer abc.def"));
        assert_eq!(request.header("Accept"), Some("text/event-stream"));
        assert_eq!(request.header("Content-Type"), None);
    }
}
