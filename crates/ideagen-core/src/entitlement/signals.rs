//! Entitlement signals
//!
//! Each signal is an independent, null-safe predicate over one profile field.
//! A missing namespace, a missing field, or a value of the wrong JSON type is
//! simply "no match".

use serde_json::Value;

use super::Profile;

/// Value written by the billing webhook when a subscription is live
pub const ACTIVE_STATUS: &str = "active";

/// Plan identifier used by the pricing table's premium tier
pub const PREMIUM_TIER: &str = "premium_subscription";

/// A named predicate over a profile
#[derive(Clone, Copy)]
pub struct EntitlementSignal {
    /// Short name used in diagnostics
    pub name: &'static str,
    /// Returns true when this signal grants access
    pub matches: fn(&Profile) -> bool,
}

impl std::fmt::Debug for EntitlementSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementSignal")
            .field("name", &self.name)
            .finish()
    }
}

/// Every signal that can grant access. Append here to add a new source.
pub const SIGNALS: &[EntitlementSignal] = &[
    EntitlementSignal {
        name: "public.subscriptionStatus",
        matches: public_status_active,
    },
    EntitlementSignal {
        name: "public.subscription",
        matches: public_tier_premium,
    },
    EntitlementSignal {
        name: "unsafe.subscriptionStatus",
        matches: self_reported_status_active,
    },
    EntitlementSignal {
        name: "private.subscriptionStatus",
        matches: private_status_active,
    },
];

fn public_status_active(profile: &Profile) -> bool {
    field_equals(
        profile.public_metadata.as_ref(),
        "subscriptionStatus",
        ACTIVE_STATUS,
    )
}

fn public_tier_premium(profile: &Profile) -> bool {
    field_equals(profile.public_metadata.as_ref(), "subscription", PREMIUM_TIER)
}

fn self_reported_status_active(profile: &Profile) -> bool {
    field_equals(
        profile.unsafe_metadata.as_ref(),
        "subscriptionStatus",
        ACTIVE_STATUS,
    )
}

fn private_status_active(profile: &Profile) -> bool {
    field_equals(
        profile.private_metadata.as_ref(),
        "subscriptionStatus",
        ACTIVE_STATUS,
    )
}

/// Null-safe `namespace[field] == expected` for string values
fn field_equals(namespace: Option<&Value>, field: &str, expected: &str) -> bool {
    namespace
        .and_then(|ns| ns.get(field))
        .and_then(|v| v.as_str())
        .is_some_and(|v| v == expected)
}
