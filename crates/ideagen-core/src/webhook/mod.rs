//! Subscription webhooks
//!
//! Billing events arrive signed; a verified subscription event becomes a
//! `public.subscriptionStatus` update on the user's profile, which is the
//! first entitlement signal the resolver checks.

mod metadata;
mod signature;

pub use metadata::{MetadataClient, DEFAULT_API_BASE};
pub use signature::{sign, verify_signature, WebhookHeaders};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::entitlement::ACTIVE_STATUS;
use crate::error::WebhookError;

/// Status written when a subscription ends
pub const INACTIVE_STATUS: &str = "inactive";

/// A webhook delivery body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// A status to write to one user's public metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionUpdate {
    pub user_id: String,
    pub status: String,
}

impl SubscriptionUpdate {
    /// Derive the update for an event, if it is a subscription event with a user
    pub fn from_event(event: &WebhookEvent) -> Option<Self> {
        let field = |name: &str| {
            event
                .data
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match event.event_type.as_deref()? {
            "subscription.created" | "subscription.updated" => Some(Self {
                user_id: field("user_id")?,
                status: field("status")?,
            }),
            "subscription.deleted" | "subscription.cancelled" => Some(Self {
                user_id: field("user_id")?,
                status: INACTIVE_STATUS.to_string(),
            }),
            _ => None,
        }
    }

    /// Whether this update grants access
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

/// Verify and parse a delivery, returning the metadata update it implies
pub fn process_webhook(
    secret: &str,
    headers: &WebhookHeaders,
    body: &str,
) -> Result<Option<SubscriptionUpdate>, WebhookError> {
    verify_signature(secret, headers, body)?;

    let event: WebhookEvent =
        serde_json::from_str(body).map_err(|_| WebhookError::InvalidJson)?;
    info!(
        "Received webhook: {}",
        event.event_type.as_deref().unwrap_or("unknown")
    );

    let update = SubscriptionUpdate::from_event(&event);
    match &update {
        Some(update) => info!(
            "Subscription for {} is now {}",
            update.user_id, update.status
        ),
        None => debug!("Webhook carries no subscription update"),
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signed(body: &str) -> WebhookHeaders {
        let signature = sign("whsec", "msg_9", "1700000000", body).unwrap();
        WebhookHeaders {
            id: "msg_9".to_string(),
            timestamp: "1700000000".to_string(),
            signature: format!("v1,{}", signature),
        }
    }

    #[test]
    fn test_created_event_sets_status() {
        let body = json!({
            "type": "subscription.created",
            "data": {"user_id": "user_1", "status": "active"}
        })
        .to_string();
        let update = process_webhook("whsec", &signed(&body), &body).unwrap();
        assert_eq!(
            update,
            Some(SubscriptionUpdate {
                user_id: "user_1".to_string(),
                status: "active".to_string(),
            })
        );
        assert!(update.unwrap().is_active());
    }

    #[test]
    fn test_cancelled_event_sets_inactive() {
        let body = json!({
            "type": "subscription.cancelled",
            "data": {"user_id": "user_1", "status": "whatever"}
        })
        .to_string();
        let update = process_webhook("whsec", &signed(&body), &body)
            .unwrap()
            .unwrap();
        assert_eq!(update.status, INACTIVE_STATUS);
        assert!(!update.is_active());
    }

    #[test]
    fn test_incomplete_or_unrelated_events() {
        let events = [
            json!({"type": "subscription.updated", "data": {"user_id": "user_1"}}),
            json!({"type": "subscription.deleted", "data": {}}),
            json!({"type": "user.created", "data": {"user_id": "user_1", "status": "active"}}),
            json!({"data": {"user_id": "user_1", "status": "active"}}),
        ];
        for event in events {
            let event: WebhookEvent = serde_json::from_value(event).unwrap();
            assert_eq!(SubscriptionUpdate::from_event(&event), None);
        }
    }

    #[test]
    fn test_invalid_json_after_valid_signature() {
        let body = "not json";
        assert_eq!(
            process_webhook("whsec", &signed(body), body),
            Err(WebhookError::InvalidJson)
        );
    }

    #[test]
    fn test_signature_checked_before_parsing() {
        let body = "not json";
        let mut headers = signed(body);
        headers.signature = "v1,00".to_string();
        assert_eq!(
            process_webhook("whsec", &headers, body),
            Err(WebhookError::InvalidSignature)
        );
    }
}
