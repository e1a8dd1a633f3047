//! File-backed identity
//!
//! Reads the session written by the sign-in flow. The token is re-read from
//! disk on every request so an expired credential is never reused.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

use super::identity::IdentityProvider;
use super::types::StoredSession;
use crate::entitlement::ProfileSnapshot;

pub struct FileIdentity {
    storage_path: PathBuf,
    profile: RwLock<ProfileSnapshot>,
}

impl FileIdentity {
    pub async fn new(storage_path: PathBuf) -> Self {
        info!("FileIdentity: Initializing with path: {:?}", storage_path);
        let session = load_session(&storage_path).await;
        Self {
            storage_path,
            profile: RwLock::new(ProfileSnapshot::Ready(
                session.and_then(|s| s.profile),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Re-read the profile from disk
    pub async fn reload(&self) -> ProfileSnapshot {
        let session = load_session(&self.storage_path).await;
        let snapshot = ProfileSnapshot::Ready(session.and_then(|s| s.profile));
        *self.profile.write() = snapshot.clone();
        snapshot
    }

    /// Save a session to disk with proper permissions
    pub async fn save(&self, session: &StoredSession) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.storage_path, json).await?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(&self.storage_path).await?;
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o600); // Read/write for owner only
            fs::set_permissions(&self.storage_path, permissions).await?;
        }

        *self.profile.write() = ProfileSnapshot::Ready(session.profile.clone());
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FileIdentity {
    fn current_profile(&self) -> ProfileSnapshot {
        self.profile.read().clone()
    }

    async fn get_token(&self) -> Option<String> {
        let session = load_session(&self.storage_path).await?;
        match session.usable_token() {
            Some(token) => Some(token.to_string()),
            None if session.is_expired() => {
                warn!("FileIdentity: Stored token has expired");
                None
            }
            None => {
                debug!("FileIdentity: No token in session file");
                None
            }
        }
    }
}

/// Missing or unreadable files are treated as signed out
async fn load_session(path: &Path) -> Option<StoredSession> {
    if !path.exists() {
        warn!("FileIdentity: Session file does not exist at {:?}", path);
        return None;
    }

    match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str::<StoredSession>(&content) {
            Ok(session) => {
                debug!("FileIdentity: Loaded session from {:?}", path);
                Some(session)
            }
            Err(e) => {
                error!("FileIdentity: Failed to parse session file: {}", e);
                None
            }
        },
        Err(e) => {
            error!("FileIdentity: Failed to read session file: {}", e);
            None
        }
    }
}
