//! The persisted subscription record and entitlement states.
//!
//! RULE: at most one record exists at a time. It is overwritten in place on
//! every mutation and replaced wholesale by every new purchase — never
//! merged, never explicitly deleted.

use crate::{
    policy::EntitlementPolicy,
    purchase::PurchaseConfirmation,
    types::{ElapsedMs, PurchaseToken, TimestampMs},
};
use serde::{Deserialize, Serialize};

/// Entitlement states. `SurvivalMode` never blocks the user, even when the
/// subscription cannot be verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementState {
    Active,
    SurvivalMode,
    NotEntitled,
}

impl EntitlementState {
    /// True when the user may access full app functionality.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::SurvivalMode)
    }

    /// Human readable label for diagnostics / UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::SurvivalMode => "Survival Mode",
            Self::NotEntitled => "Not Entitled",
        }
    }

    /// Canonical string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::SurvivalMode => "survival_mode",
            Self::NotEntitled => "not_entitled",
        }
    }

    /// Parse the canonical form. Unknown strings default to `NotEntitled`,
    /// the safe value for a corrupt or future-version record.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "survival_mode" => Self::SurvivalMode,
            _ => Self::NotEntitled,
        }
    }
}

impl std::fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Persistent record of subscription and survival context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRecord {
    /// Wall-clock start of the last confirmed paid period.
    pub purchase_start_utc: TimestampMs,
    /// Wall-clock end of the last confirmed paid period.
    pub last_known_expiry_utc: TimestampMs,
    /// Wall-clock time of the last successful evaluation.
    pub last_verification_utc: TimestampMs,
    /// Monotonic reading paired with `last_verification_utc`; 0 means unset.
    pub system_elapsed_realtime_at_verification: ElapsedMs,
    /// Opaque identifier of the last known purchase.
    pub purchase_token: PurchaseToken,
    /// Last computed state, stored for diagnostics.
    pub entitlement_state: EntitlementState,
    /// Set once when grace access begins; never cleared until a fresh
    /// purchase replaces the record. `None` is distinct from 0.
    pub survival_mode_activated_at_utc: Option<TimestampMs>,
    /// Wall clock appears manipulated relative to monotonic time.
    pub clock_suspicious: bool,
    /// Last known renewal intent from the purchase source.
    pub auto_renewing: bool,
}

impl SubscriptionRecord {
    /// Build the brand-new record for a confirmed purchase. Supersedes any
    /// prior record: survival timestamp null, suspicion cleared.
    pub fn from_purchase(
        purchase: &PurchaseConfirmation,
        now_utc: TimestampMs,
        elapsed: ElapsedMs,
        policy: &EntitlementPolicy,
    ) -> Self {
        let start = if purchase.purchase_time_utc > 0 {
            purchase.purchase_time_utc
        } else {
            now_utc
        };
        Self {
            purchase_start_utc: start,
            last_known_expiry_utc: start + policy.subscription_validity_ms,
            last_verification_utc: now_utc,
            system_elapsed_realtime_at_verification: elapsed,
            purchase_token: purchase.token.clone(),
            entitlement_state: EntitlementState::Active,
            survival_mode_activated_at_utc: None,
            clock_suspicious: false,
            auto_renewing: purchase.auto_renewing,
        }
    }
}
