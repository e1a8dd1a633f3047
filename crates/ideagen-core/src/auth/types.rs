//! Stored session types

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::entitlement::Profile;

/// Session data persisted by the identity provider's sign-in flow
///
/// Each field is parsed on its own, so a malformed profile never costs the
/// token and vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredSession {
    /// Bearer token for the idea stream endpoint
    #[serde(default, deserialize_with = "lenient")]
    pub token: Option<String>,
    /// When the token stops being accepted (if known)
    #[serde(default, deserialize_with = "lenient")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Last profile fetched for the signed-in user
    #[serde(default, deserialize_with = "lenient")]
    pub profile: Option<Profile>,
}

impl StoredSession {
    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Token usable for a new request, if any
    pub fn usable_token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Accept any JSON for the field; anything that doesn't fit becomes `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Option<T>>(value).ok().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_expiry() {
        // Token expiring in the future
        let session = StoredSession {
            token: Some("jwt".to_string()),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            profile: None,
        };
        assert!(!session.is_expired());
        assert_eq!(session.usable_token(), Some("jwt"));

        // Token expired in the past
        let expired = StoredSession {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..session.clone()
        };
        assert!(expired.is_expired());
        assert_eq!(expired.usable_token(), None);

        // Token with no expiry
        let no_expiry = StoredSession {
            expires_at: None,
            ..session
        };
        assert!(!no_expiry.is_expired());
    }

    #[test]
    fn test_blank_token_is_unusable() {
        let session = StoredSession {
            token: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(session.usable_token(), None);
        assert_eq!(StoredSession::default().usable_token(), None);
    }

    #[test]
    fn test_bad_profile_keeps_token() {
        let session: StoredSession = serde_json::from_str(
            r#"{"token":"jwt","profile":{"id":42,"publicMetadata":{"subscriptionStatus":"active"}}}"#,
        )
        .unwrap();
        assert_eq!(session.usable_token(), Some("jwt"));
        let profile = session.profile.unwrap();
        assert_eq!(profile.id.as_deref(), Some("42"));
        assert!(crate::entitlement::resolve(Some(&profile)).is_granted());

        let session: StoredSession =
            serde_json::from_str(r#"{"token":"jwt","profile":[1,2],"expires_at":"soon"}"#).unwrap();
        assert_eq!(session.usable_token(), Some("jwt"));
        assert!(session.expires_at.is_none());
    }

    #[test]
    fn test_bad_token_keeps_profile() {
        let session: StoredSession = serde_json::from_str(
            r#"{"token":17,"profile":{"public_metadata":{"subscriptionStatus":"active"}}}"#,
        )
        .unwrap();
        assert_eq!(session.usable_token(), None);
        assert!(crate::entitlement::resolve(session.profile.as_ref()).is_granted());
    }
}
