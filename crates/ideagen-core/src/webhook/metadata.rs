//! Profile metadata updates
//!
//! Writes a subscription status to the identity provider's user record.

use anyhow::{anyhow, Result};
use tracing::{error, info};
use url::Url;

use super::SubscriptionUpdate;

pub const DEFAULT_API_BASE: &str = "https://api.clerk.com";

pub struct MetadataClient {
    client: reqwest::Client,
    api_base: Url,
    secret_key: String,
}

impl MetadataClient {
    pub fn new(api_base: Url, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }

    /// `{api_base}/v1/users/{user_id}`, keeping any path on the base
    fn user_url(&self, user_id: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base {} cannot carry a path", self.api_base))?
            .pop_if_empty()
            .extend(["v1", "users", user_id]);
        Ok(url)
    }

    /// `PATCH /v1/users/{id}` with the new public subscription status
    pub async fn apply(&self, update: &SubscriptionUpdate) -> Result<()> {
        let url = self.user_url(&update.user_id)?;

        let body = serde_json::json!({
            "public_metadata": {
                "subscriptionStatus": update.status
            }
        });

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(
                "Updated user {} subscription status to {}",
                update.user_id, update.status
            );
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            error!("Failed to update user metadata: {} - {}", status, text);
            Err(anyhow!("metadata update failed: {}", status))
        }
    }
}
