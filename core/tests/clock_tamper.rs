//! Clock-tamper suspicion: the flag follows wall/monotonic drift but never
//! decides access — the expiry comparison alone governs the state.

use crisis_core::{
    evaluator::evaluate,
    policy::EntitlementPolicy,
    record::{EntitlementState, SubscriptionRecord},
    types::{ElapsedMs, TimestampMs, DAY_MS},
};

fn record(
    expiry: TimestampMs,
    last_verification: TimestampMs,
    elapsed_at_verification: ElapsedMs,
) -> SubscriptionRecord {
    SubscriptionRecord {
        purchase_start_utc: 0,
        last_known_expiry_utc: expiry,
        last_verification_utc: last_verification,
        system_elapsed_realtime_at_verification: elapsed_at_verification,
        purchase_token: "tok".into(),
        entitlement_state: EntitlementState::Active,
        survival_mode_activated_at_utc: None,
        clock_suspicious: false,
        auto_renewing: true,
    }
}

#[test]
fn forward_jump_sets_suspicious_flag() {
    let policy = EntitlementPolicy::default();
    let now = 2_000_000_000;
    // Wall clock raced 61 days ahead while only 5 seconds of monotonic
    // time passed.
    let rec = record(now + 100_000, now - 61 * DAY_MS, 10_000);

    let eval = evaluate(Some(&rec), now, 15_000, true, &policy);

    assert_eq!(eval.state, EntitlementState::Active, "state still follows expiry");
    assert!(eval.updated.unwrap().clock_suspicious);
}

#[test]
fn backward_jump_sets_suspicious_flag() {
    let policy = EntitlementPolicy::default();
    let now = 10_000_000_000;
    // Last verification sits in the future relative to now: the user moved
    // the clock backward beyond the 3-day tolerance.
    let future_verification = now + policy.clock_drift_back_threshold_ms + 10_000;
    let rec = record(now + 500_000, future_verification, 1_000);

    let eval = evaluate(Some(&rec), now, 20_000, true, &policy);

    assert!(eval.updated.unwrap().clock_suspicious);
    assert_eq!(eval.state, EntitlementState::Active);
}

#[test]
fn long_offline_period_is_not_suspicious() {
    let policy = EntitlementPolicy::default();
    let now = 100 * DAY_MS;
    // 90 days offline, wall and monotonic clocks agreeing.
    let rec = record(now + DAY_MS, now - 90 * DAY_MS, 5_000);

    let eval = evaluate(Some(&rec), now, 5_000 + 90 * DAY_MS, true, &policy);

    assert!(!eval.updated.unwrap().clock_suspicious);
    assert_eq!(eval.state, EntitlementState::Active);
}

#[test]
fn unset_monotonic_reading_carries_no_elapsed_information() {
    let policy = EntitlementPolicy::default();
    let now = 200 * DAY_MS;
    // Stored reading of 0 means unset: the elapsed delta is treated as 0,
    // so a 61-day wall gap alone trips the forward check.
    let rec = record(now + DAY_MS, now - 61 * DAY_MS, 0);

    let eval = evaluate(Some(&rec), now, 999_999_999, true, &policy);

    assert!(eval.updated.unwrap().clock_suspicious);
}

#[test]
fn flag_follows_recomputed_value_when_drift_normalizes() {
    let policy = EntitlementPolicy::default();
    let now = 300 * DAY_MS;
    let mut rec = record(now + DAY_MS, now - 1_000, 5_000);
    rec.clock_suspicious = true;

    // Wall and monotonic deltas agree again: the flag is recomputed to
    // false and the record is updated for the change.
    let eval = evaluate(Some(&rec), now, 6_000, true, &policy);

    assert!(!eval.updated.unwrap().clock_suspicious);
}

#[test]
fn small_backward_drift_within_tolerance_is_ignored() {
    let policy = EntitlementPolicy::default();
    let now = 400 * DAY_MS;
    // One day backward: inside the 3-day tolerance (e.g. timezone fix).
    let rec = record(now + DAY_MS, now + DAY_MS, 1_000);

    let eval = evaluate(Some(&rec), now, 2_000, true, &policy);

    assert!(!eval.updated.unwrap().clock_suspicious);
}
