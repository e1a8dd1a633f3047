//! Idea stream
//!
//! - SSE decoding of the server-push response
//! - Transport seam plus the reqwest implementation
//! - `StreamSession` state machine owning one connection and its buffer

mod buffer;
mod handle;
mod http;
pub mod sse;
mod session;
mod state;
mod transport;

pub use buffer::ContentBuffer;
pub use handle::StreamHandle;
pub use http::HttpEventStream;
pub use session::StreamSession;
pub use state::{ErrorReason, SessionSnapshot, StreamState};
pub use transport::{EventStreamTransport, StreamRequest, TransportEvent};
