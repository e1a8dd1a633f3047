//! Stream session
//!
//! Owns one authenticated idea stream: acquires a token, opens the
//! connection, accumulates fragments, and publishes a snapshot after every
//! change. Callback methods are the only way state changes, and `stop` is the
//! single idempotent teardown (also run on drop).

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::buffer::ContentBuffer;
use super::handle::StreamHandle;
use super::state::{ErrorReason, SessionSnapshot, StreamState};
use super::transport::{EventStreamTransport, StreamRequest, TransportEvent};
use crate::auth::IdentityProvider;
use crate::error::TransportError;

pub struct StreamSession {
    endpoint: Url,
    transport: Arc<dyn EventStreamTransport>,
    state: StreamState,
    /// Every state this session has been in, oldest first
    history: Vec<StreamState>,
    buffer: ContentBuffer,
    handle: Option<StreamHandle>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    stopped: bool,
    notifier: watch::Sender<SessionSnapshot>,
}

impl StreamSession {
    pub fn new(endpoint: Url, transport: Arc<dyn EventStreamTransport>) -> Self {
        let (notifier, _) = watch::channel(SessionSnapshot::default());
        Self {
            endpoint,
            transport,
            state: StreamState::Idle,
            history: vec![StreamState::Idle],
            buffer: ContentBuffer::new(),
            handle: None,
            events: None,
            stopped: false,
            notifier,
        }
    }

    /// Receive a snapshot after every state change and appended fragment
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.notifier.subscribe()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn history(&self) -> &[StreamState] {
        &self.history
    }

    pub fn content(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            content: self.buffer.as_str().to_string(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Acquire a fresh token and open the stream
    ///
    /// Without a token the session fails with `Unauthenticated` and never
    /// connects. Only an idle, un-stopped session can start.
    pub async fn start(&mut self, identity: &dyn IdentityProvider) {
        if self.stopped || self.state != StreamState::Idle {
            warn!(
                "Ignoring start on a {} session (stopped: {})",
                self.state.name(),
                self.stopped
            );
            return;
        }

        debug!("Acquiring bearer token for idea stream");
        let Some(token) = identity.get_token().await else {
            warn!("No bearer token available; not connecting");
            self.transition(StreamState::Errored(ErrorReason::Unauthenticated));
            return;
        };

        self.transition(StreamState::Authenticating);

        let (tx, rx) = mpsc::unbounded_channel();
        let request = StreamRequest::authenticated(self.endpoint.clone(), &token);
        info!("Connecting to idea stream at {}", self.endpoint);
        self.handle = Some(self.transport.connect(request, tx));
        self.events = Some(rx);
    }

    /// Append one fragment
    pub fn on_fragment(&mut self, fragment: &str) {
        if self.stopped {
            debug!("Ignoring fragment delivered after stop");
            return;
        }

        match self.state {
            StreamState::Authenticating => {
                info!("First fragment received; streaming");
                self.set_state(StreamState::Streaming);
            }
            StreamState::Streaming => {}
            StreamState::Idle | StreamState::Complete | StreamState::Errored(_) => {
                debug!("Ignoring fragment in {} state", self.state.name());
                return;
            }
        }

        self.buffer.push(fragment);
        debug!(
            "Fragment #{}: {} chars (total: {} chars)",
            self.buffer.fragment_count(),
            fragment.len(),
            self.buffer.len()
        );
        self.publish();
    }

    /// Record a connection failure. Terminal; there is no retry.
    pub fn on_error(&mut self, err: TransportError) {
        if self.stopped || !self.is_connected_state() {
            debug!("Ignoring transport error in {} state: {}", self.state.name(), err);
            return;
        }

        error!(
            "Idea stream failed after {} fragments: {}",
            self.buffer.fragment_count(),
            err
        );
        self.release_connection();
        self.transition(StreamState::Errored(ErrorReason::Transport(err)));
    }

    /// Server closed the stream normally; the buffer is final
    pub fn on_complete(&mut self) {
        if self.stopped || !self.is_connected_state() {
            debug!("Ignoring completion in {} state", self.state.name());
            return;
        }

        info!(
            "Idea stream complete: {} fragments, {} chars",
            self.buffer.fragment_count(),
            self.buffer.len()
        );
        self.release_connection();
        self.transition(StreamState::Complete);
    }

    /// Route one transport event to its callback
    pub fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Fragment(fragment) => self.on_fragment(&fragment),
            TransportEvent::Error(err) => self.on_error(err),
            TransportEvent::Complete => self.on_complete(),
        }
    }

    /// Wait for the next transport event. `None` once there is no connection
    /// or the transport has gone away.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.as_mut()?.recv().await
    }

    /// Pump transport events until the session ends or is stopped
    pub async fn run(&mut self) {
        while !self.stopped && !self.state.is_terminal() {
            if self.events.is_none() {
                break;
            }
            match self.next_event().await {
                Some(event) => self.dispatch(event),
                None => {
                    // Transport dropped its sender without reporting an outcome
                    self.on_error(TransportError::Disconnected);
                }
            }
        }
    }

    /// Start and run the session until it ends or `cancel` fires, then tear down
    pub async fn run_until_cancelled(
        &mut self,
        identity: &dyn IdentityProvider,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Idea stream session cancelled");
            }
            _ = async {
                self.start(identity).await;
                self.run().await;
            } => {}
        }
        self.stop();
    }

    /// Close the connection. Safe to call in any state, any number of times.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.release_connection();
        info!("Idea stream session stopped in {} state", self.state.name());
    }

    fn is_connected_state(&self) -> bool {
        matches!(
            self.state,
            StreamState::Authenticating | StreamState::Streaming
        )
    }

    fn release_connection(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.events = None;
    }

    fn set_state(&mut self, state: StreamState) {
        debug!("Stream state: {} -> {}", self.state.name(), state.name());
        self.history.push(state.clone());
        self.state = state;
    }

    fn transition(&mut self, state: StreamState) {
        self.set_state(state);
        self.publish();
    }

    fn publish(&self) {
        self.notifier.send_replace(self.snapshot());
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;
    use parking_lot::Mutex;

    /// Transport that records requests and hands the sender to the test
    #[derive(Default)]
    struct FakeTransport {
        requests: Mutex<Vec<StreamRequest>>,
        senders: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
        tokens: Mutex<Vec<CancellationToken>>,
    }

    impl FakeTransport {
        fn connections(&self) -> usize {
            self.requests.lock().len()
        }

        fn sender(&self) -> mpsc::UnboundedSender<TransportEvent> {
            self.senders.lock()[0].clone()
        }

        fn handle_stopped(&self) -> bool {
            self.tokens.lock()[0].is_cancelled()
        }
    }

    impl EventStreamTransport for FakeTransport {
        fn connect(
            &self,
            request: StreamRequest,
            events: mpsc::UnboundedSender<TransportEvent>,
        ) -> StreamHandle {
            let token = CancellationToken::new();
            self.requests.lock().push(request);
            self.senders.lock().push(events);
            self.tokens.lock().push(token.clone());
            StreamHandle::detached(token)
        }
    }

    fn endpoint() -> Url {
        Url::parse("http://localhost:8000/api").unwrap()
    }

    fn session_with(transport: &Arc<FakeTransport>) -> StreamSession {
        StreamSession::new(endpoint(), transport.clone())
    }

    fn signed_in() -> StaticIdentity {
        StaticIdentity::new(None, Some("jwt".to_string()))
    }

    #[tokio::test]
    async fn test_fragments_accumulate_in_order() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;

        assert_eq!(session.state(), &StreamState::Authenticating);
        assert_eq!(transport.connections(), 1);
        assert_eq!(
            transport.requests.lock()[0].header("Authorization"),
            Some("Bearer jwt")
        );

        for fragment in ["Idea: ", "A marketplace ", "for recycled electronics."] {
            session.on_fragment(fragment);
        }
        assert_eq!(session.content(), "Idea: A marketplace for recycled electronics.");
        assert_eq!(session.state(), &StreamState::Streaming);

        session.on_complete();
        assert_eq!(
            session.history(),
            &[
                StreamState::Idle,
                StreamState::Authenticating,
                StreamState::Streaming,
                StreamState::Complete,
            ]
        );
        assert!(transport.handle_stopped());
    }

    #[tokio::test]
    async fn test_no_token_never_connects() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&StaticIdentity::new(None, None)).await;

        assert_eq!(
            session.history(),
            &[
                StreamState::Idle,
                StreamState::Errored(ErrorReason::Unauthenticated),
            ]
        );
        assert!(session.content().is_empty());
        assert_eq!(transport.connections(), 0);
    }

    #[tokio::test]
    async fn test_error_keeps_received_content() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;

        let tx = transport.sender();
        tx.send(TransportEvent::Fragment("Idea: ".to_string())).unwrap();
        tx.send(TransportEvent::Error(TransportError::Read("reset".to_string())))
            .unwrap();
        session.run().await;

        assert_eq!(
            session.history(),
            &[
                StreamState::Idle,
                StreamState::Authenticating,
                StreamState::Streaming,
                StreamState::Errored(ErrorReason::Transport(TransportError::Read(
                    "reset".to_string()
                ))),
            ]
        );
        assert_eq!(session.content(), "Idea: ");
        assert!(transport.handle_stopped());
    }

    #[tokio::test]
    async fn test_connect_failure_before_first_fragment() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;
        session.on_error(TransportError::Connect("refused".to_string()));

        assert!(matches!(
            session.state(),
            StreamState::Errored(ErrorReason::Transport(TransportError::Connect(_)))
        ));
        assert!(!session.history().contains(&StreamState::Streaming));
    }

    #[tokio::test]
    async fn test_stop_makes_late_fragments_noops() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;
        session.on_fragment("kept");

        session.stop();
        session.stop();
        assert!(transport.handle_stopped());

        session.on_fragment(" dropped");
        session.on_error(TransportError::Disconnected);
        session.on_complete();
        assert_eq!(session.content(), "kept");
        assert_eq!(session.state(), &StreamState::Streaming);
        assert!(session.is_stopped());
    }

    #[tokio::test]
    async fn test_stop_before_start_prevents_connection() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.stop();
        session.start(&signed_in()).await;
        assert_eq!(transport.connections(), 0);
        assert_eq!(session.state(), &StreamState::Idle);
    }

    #[tokio::test]
    async fn test_complete_rejects_further_fragments() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;
        session.on_fragment("done");
        session.on_complete();
        session.on_fragment(" extra");
        session.on_error(TransportError::Disconnected);
        assert_eq!(session.content(), "done");
        assert_eq!(session.state(), &StreamState::Complete);
    }

    #[tokio::test]
    async fn test_second_start_is_ignored() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        let identity = signed_in();
        session.start(&identity).await;
        session.start(&identity).await;
        assert_eq!(transport.connections(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_change() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        let mut rx = session.subscribe();
        assert!(rx.borrow_and_update().state.is_pending());

        session.start(&signed_in()).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, StreamState::Authenticating);

        session.on_fragment("# Ti");
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.state, StreamState::Streaming);
        assert_eq!(snapshot.content, "# Ti");
    }

    #[tokio::test]
    async fn test_dropped_sender_is_a_transport_error() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;
        transport.senders.lock().clear();
        session.run().await;
        assert_eq!(
            session.state(),
            &StreamState::Errored(ErrorReason::Transport(TransportError::Disconnected))
        );
    }

    #[tokio::test]
    async fn test_run_until_cancelled_tears_down() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        let cancel = CancellationToken::new();
        let identity = signed_in();

        let canceller = cancel.clone();
        let sender_source = transport.clone();
        tokio::spawn(async move {
            // Wait for the connection, deliver one fragment, then cancel
            loop {
                if sender_source.connections() > 0 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            sender_source
                .sender()
                .send(TransportEvent::Fragment("partial".to_string()))
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        session.run_until_cancelled(&identity, cancel).await;
        assert!(session.is_stopped());
        assert_eq!(session.content(), "partial");
        assert!(transport.handle_stopped());
    }

    #[tokio::test]
    async fn test_drop_stops_connection() {
        let transport = Arc::new(FakeTransport::default());
        let mut session = session_with(&transport);
        session.start(&signed_in()).await;
        drop(session);
        assert!(transport.handle_stopped());
    }
}
