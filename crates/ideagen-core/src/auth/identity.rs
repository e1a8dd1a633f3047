//! Identity provider seam
//!
//! The session and the view never reach for an ambient user context; the
//! provider is passed in explicitly.

use async_trait::async_trait;

use crate::entitlement::{Profile, ProfileSnapshot};

/// Source of the current user's profile and bearer token
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Synchronous snapshot of the profile; may still be loading
    fn current_profile(&self) -> ProfileSnapshot;

    /// Acquire a bearer token. `None` means unauthenticated.
    async fn get_token(&self) -> Option<String>;
}

/// Fixed in-memory identity
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    profile: ProfileSnapshot,
    token: Option<String>,
}

impl StaticIdentity {
    pub fn new(profile: Option<Profile>, token: Option<String>) -> Self {
        Self {
            profile: ProfileSnapshot::Ready(profile),
            token,
        }
    }

    /// An identity whose profile has not loaded yet
    pub fn loading() -> Self {
        Self {
            profile: ProfileSnapshot::Loading,
            token: None,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn current_profile(&self) -> ProfileSnapshot {
        self.profile.clone()
    }

    async fn get_token(&self) -> Option<String> {
        self.token.clone()
    }
}
