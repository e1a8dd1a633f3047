//! Webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme prefix accepted in the signature header
const SCHEME_V1: &str = "v1,";

/// The three svix headers that accompany every delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub id: String,
    pub timestamp: String,
    /// Space-separated `v1,<hex>` entries
    pub signature: String,
}

impl WebhookHeaders {
    /// Build from header lookups; all three must be present and non-empty
    pub fn from_lookup<'a>(
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<Self, WebhookError> {
        let get = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(WebhookError::MissingHeaders)
        };
        Ok(Self {
            id: get("svix-id")?,
            timestamp: get("svix-timestamp")?,
            signature: get("svix-signature")?,
        })
    }
}

/// Hex HMAC-SHA256 of `"{id}.{timestamp}.{body}"`
pub fn sign(secret: &str, id: &str, timestamp: &str, body: &str) -> Result<String, WebhookError> {
    let mac = mac_for(secret, id, timestamp, body)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check that any `v1` entry in the signature header matches the body
pub fn verify_signature(
    secret: &str,
    headers: &WebhookHeaders,
    body: &str,
) -> Result<(), WebhookError> {
    let verified = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix(SCHEME_V1))
        .filter_map(|provided| hex::decode(provided).ok())
        .any(|provided| {
            // verify_slice compares in constant time
            mac_for(secret, &headers.id, &headers.timestamp, body)
                .is_ok_and(|mac| mac.verify_slice(&provided).is_ok())
        });

    if verified {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

fn mac_for(
    secret: &str,
    id: &str,
    timestamp: &str,
    body: &str,
) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    Ok(mac)
}
