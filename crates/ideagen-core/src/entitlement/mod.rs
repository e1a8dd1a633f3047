//! Entitlement resolution
//!
//! Maps a user profile to an access decision. The decision is an OR over
//! [`SIGNALS`]; resolution is total and never fails on partial input.

mod signals;

pub use signals::{EntitlementSignal, ACTIVE_STATUS, PREMIUM_TIER, SIGNALS};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// User profile as reported by the identity provider
///
/// Metadata namespaces are free-form JSON; nothing about their shape is assumed.
/// Deserialization never fails on an object: unusable fields are dropped, and
/// when a namespace appears in both spellings the snake_case one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub id: Option<String>,
    pub public_metadata: Option<Value>,
    /// Self-reported metadata, writable by the user
    pub unsafe_metadata: Option<Value>,
    /// Only readable in trusted contexts; usually absent on the client
    pub private_metadata: Option<Value>,
}

impl Profile {
    /// Build a profile from arbitrary JSON, keeping whatever is usable
    pub fn from_value(value: &Value) -> Self {
        let namespace = |snake: &str, camel: &str| {
            value
                .get(snake)
                .filter(|v| !v.is_null())
                .or_else(|| value.get(camel).filter(|v| !v.is_null()))
                .cloned()
        };

        let id = match value.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Self {
            id,
            public_metadata: namespace("public_metadata", "publicMetadata"),
            unsafe_metadata: namespace("unsafe_metadata", "unsafeMetadata"),
            private_metadata: namespace("private_metadata", "privateMetadata"),
        }
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Whether the user may open the idea stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessDecision::Granted => write!(f, "granted"),
            AccessDecision::Denied => write!(f, "denied"),
        }
    }
}

/// Snapshot of the identity provider's profile state
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSnapshot {
    /// The provider has not finished loading
    Loading,
    /// Loading finished; `None` means signed out
    Ready(Option<Profile>),
}

impl ProfileSnapshot {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            ProfileSnapshot::Ready(profile) => profile.as_ref(),
            ProfileSnapshot::Loading => None,
        }
    }
}

/// What the hosting view should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Loading,
    Paywall,
    Granted,
}

/// Resolve access from a profile using the standard signal list
pub fn resolve(profile: Option<&Profile>) -> AccessDecision {
    resolve_with(profile, SIGNALS)
}

/// Resolve access from a profile using a caller-supplied signal list
pub fn resolve_with(profile: Option<&Profile>, signals: &[EntitlementSignal]) -> AccessDecision {
    let granted = profile.is_some_and(|p| signals.iter().any(|signal| (signal.matches)(p)));
    if granted {
        AccessDecision::Granted
    } else {
        AccessDecision::Denied
    }
}

/// Names of the signals that matched, for diagnostics
pub fn matched_signals(profile: Option<&Profile>) -> Vec<&'static str> {
    let Some(profile) = profile else {
        return Vec::new();
    };
    SIGNALS
        .iter()
        .filter(|signal| (signal.matches)(profile))
        .map(|signal| signal.name)
        .collect()
}

/// Decide what the hosting view shows for a profile snapshot
pub fn gate(snapshot: &ProfileSnapshot) -> Gate {
    match snapshot {
        ProfileSnapshot::Loading => Gate::Loading,
        ProfileSnapshot::Ready(profile) => {
            let decision = resolve(profile.as_ref());
            tracing::debug!(
                decision = %decision,
                signals = ?matched_signals(profile.as_ref()),
                "Resolved entitlement"
            );
            if decision.is_granted() {
                Gate::Granted
            } else {
                Gate::Paywall
            }
        }
    }
}
