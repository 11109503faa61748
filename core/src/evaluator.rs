//! The entitlement evaluator — the decision core of the engine.
//!
//! RULES:
//!   - `evaluate` is pure: no I/O, no ambient state, deterministic.
//!   - It is total: every input combination yields a defined state.
//!   - Ambiguity resolves toward access, never lockout. A missing record
//!     with usable local content, an expired subscription, or a suspicious
//!     clock all keep the user inside the app. Do not tighten this.

use crate::{
    policy::EntitlementPolicy,
    record::{EntitlementState, SubscriptionRecord},
    types::{ElapsedMs, TimestampMs},
};

/// Result of one evaluation: the state to publish and, when a record was
/// supplied, the record to persist (possibly identical to the input).
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub state: EntitlementState,
    pub updated: Option<SubscriptionRecord>,
}

/// Decide whether the user retains access.
///
/// - No record: `SurvivalMode` when local content exists (e.g. a sideloaded
///   model), `NotEntitled` otherwise. No record is produced.
/// - With a record: recompute clock suspicion, then compare `now_utc`
///   against the last known expiry. Before expiry the state is `Active`;
///   from expiry onward it is `SurvivalMode`, stamping the activation time
///   on first entry only (sticky thereafter).
pub fn evaluate(
    record: Option<&SubscriptionRecord>,
    now_utc: TimestampMs,
    elapsed_monotonic: ElapsedMs,
    has_local_content: bool,
    policy: &EntitlementPolicy,
) -> Evaluation {
    let Some(record) = record else {
        let state = if has_local_content {
            EntitlementState::SurvivalMode
        } else {
            EntitlementState::NotEntitled
        };
        return Evaluation {
            state,
            updated: None,
        };
    };

    // Clock-tamper suspicion. A stored monotonic reading of 0 means unset,
    // in which case the elapsed delta carries no information.
    let last_elapsed = record.system_elapsed_realtime_at_verification;
    let elapsed_delta = if last_elapsed == 0 {
        0
    } else {
        elapsed_monotonic - last_elapsed
    };
    let wall_delta = now_utc - record.last_verification_utc;
    let clock_suspicious = wall_delta < -policy.clock_drift_back_threshold_ms
        || wall_delta - elapsed_delta > policy.clock_drift_forward_threshold_ms;

    // Touch the record only when the flag actually changed.
    let mut updated = if clock_suspicious != record.clock_suspicious {
        let mut r = record.clone();
        r.clock_suspicious = clock_suspicious;
        r
    } else {
        record.clone()
    };

    if now_utc < updated.last_known_expiry_utc {
        Evaluation {
            state: EntitlementState::Active,
            updated: Some(updated),
        }
    } else {
        // First expiry stamps the survival activation time; later
        // evaluations leave it untouched.
        if updated.survival_mode_activated_at_utc.is_none() {
            updated.survival_mode_activated_at_utc = Some(now_utc);
        }
        Evaluation {
            state: EntitlementState::SurvivalMode,
            updated: Some(updated),
        }
    }
}
