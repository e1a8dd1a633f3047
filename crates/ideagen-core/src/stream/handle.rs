//! Connection handle
//!
//! Owns the cancellation of one event-stream connection.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Returned by a transport; stopping it closes the connection
pub struct StreamHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Handle for a connection driven by a spawned task
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            token,
            task: Some(task),
        }
    }

    /// Handle whose connection is driven elsewhere and only observes the token
    pub fn detached(token: CancellationToken) -> Self {
        Self { token, task: None }
    }

    /// Close the connection. Safe to call more than once.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
