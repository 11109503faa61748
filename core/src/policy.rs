//! Policy constants governing entitlement handling and survival access.
//!
//! Verification is manual-only: the manager syncs from the purchase source
//! on explicit user action or when a caller forces a refresh, never on a
//! background schedule of its own.

use crate::types::DAY_MS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EntitlementPolicy {
    /// Product identifier of the annual subscription.
    pub product_id_annual: String,

    /// Validity window applied to every confirmed purchase.
    pub subscription_validity_ms: i64,

    /// Backward wall-clock drift tolerated before the clock is flagged
    /// suspicious.
    pub clock_drift_back_threshold_ms: i64,

    /// Forward wall-clock drift (beyond elapsed monotonic time) tolerated
    /// before the clock is flagged suspicious.
    pub clock_drift_forward_threshold_ms: i64,

    /// Age of the last successful verification after which the UI may hint
    /// at verification debt. Never gates access.
    pub verification_debt_after_ms: i64,

    /// Minimum interval between purchase-source sync attempts unless a
    /// refresh is explicitly forced.
    pub min_sync_interval_ms: i64,

    /// Maximum number of state transitions retained in the diagnostics log.
    pub transition_log_cap: usize,

    /// Debug override: force survival mode regardless of the record.
    /// Intentionally not persisted anywhere.
    #[serde(skip)]
    pub debug_force_survival: bool,
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self {
            product_id_annual: "crisis_ai_annual".into(),
            subscription_validity_ms: 365 * DAY_MS,
            clock_drift_back_threshold_ms: 3 * DAY_MS,
            clock_drift_forward_threshold_ms: 60 * DAY_MS,
            verification_debt_after_ms: 14 * DAY_MS,
            min_sync_interval_ms: 6 * 60 * 60 * 1000,
            transition_log_cap: 50,
            debug_force_survival: false,
        }
    }
}

impl EntitlementPolicy {
    /// Load policy overrides from a JSON file. Missing keys fall back to
    /// the defaults above.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let policy: EntitlementPolicy = serde_json::from_str(&content)?;
        Ok(policy)
    }
}
