//! Identity for ideagen
//!
//! - `IdentityProvider` seam: profile snapshot plus bearer token acquisition
//! - File-backed session written by the sign-in flow
//! - Static identity for tests and embedding

mod identity;
mod session_file;
mod types;

pub use identity::{IdentityProvider, StaticIdentity};
pub use session_file::FileIdentity;
pub use types::StoredSession;
